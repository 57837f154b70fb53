//! Legacy blended route score task: a simpler value/severity blend kept
//! alongside the UPES-based score for routes that still read the older
//! field. Independent of the UPES-based scoring task; scheduled alongside
//! it rather than replacing it.

use aeris_common::{AerisResult, TaskOutcome};
use aeris_storage::store::SpatialStore;
use chrono::{Duration as ChronoDuration, Utc};
use tracing::{info, instrument, warn};

/// `score = avg_value * 0.5 + sum(severity) * 10.0` over the one-hour window
/// ending at the pollution grid's latest timestamp. A route with no
/// intersecting cells gets `last_computed_score = None` rather than being
/// skipped entirely — `last_updated_at` still advances.
#[instrument(skip(store))]
pub async fn recompute_legacy_scores(store: &SpatialStore) -> AerisResult<TaskOutcome> {
    let Some(max_ts) = store.max_timestamp().await? else {
        info!("no pollution grid data; skipping legacy score recompute");
        return Ok(TaskOutcome::Skipped("no_data".to_string()));
    };
    let window = (max_ts - ChronoDuration::hours(1), max_ts);

    let routes = store.list_saved_routes().await?;
    let now = Utc::now();
    let mut updated = 0usize;

    for route in &routes {
        let line = route.line_coords();
        match store.line_intersect_aggregate(line, window).await {
            Ok(agg) => {
                let score = agg
                    .avg_value
                    .map(|avg| round4(avg * 0.5 + agg.sum_severity as f64 * 10.0));
                if let Some(s) = score {
                    if let Err(e) = store.update_route_legacy_score(route.id, s, now).await {
                        warn!(route_id = %route.id, error = %e, "legacy score update failed");
                        continue;
                    }
                    updated += 1;
                }
            }
            Err(e) => {
                warn!(route_id = %route.id, error = %e, "legacy exposure aggregate failed for route");
            }
        }
    }

    info!(routes_updated = updated, total_routes = routes.len(), "recomputed legacy route scores");
    Ok(TaskOutcome::Ok(format!("{updated} routes updated")))
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_blends_average_and_severity_sum() {
        let avg_value = 4.0;
        let sum_severity = 2i64;
        let score = round4(avg_value * 0.5 + sum_severity as f64 * 10.0);
        assert_eq!(score, 22.0);
    }
}
