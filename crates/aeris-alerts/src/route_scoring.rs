//! Saved-route UPES scoring task, run at its own :20 cron slot: resample
//! every saved route's origin->destination line against the latest
//! final-score raster and persist the mean/max as the route's current UPES
//! score and history entry.
//!
//! Scheduled independently of the alert pipeline (which runs at :25) so
//! that a slow UPES compute at :15 never blocks alert evaluation: if this
//! task hasn't run yet this hour the alert pipeline simply uses whatever
//! `last_upes_score` is already on file.

use aeris_common::{AerisResult, TaskOutcome};
use aeris_raster::sample_upes_along_line_mean_max;
use aeris_storage::store::SpatialStore;
use chrono::Utc;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Arc-length step for origin->destination line sampling, meters.
const SAMPLE_STEP_M: f64 = 50.0;

/// Resample every saved route against `raster_path` and update its score.
/// Skipped entirely when no final-score raster exists yet this hour.
#[instrument(skip(store))]
pub async fn run_route_upes_scoring(
    store: &SpatialStore,
    raster_path: Option<&Path>,
) -> AerisResult<TaskOutcome> {
    let Some(path) = raster_path else {
        info!("no UPES raster available yet; skipping saved-route scoring");
        return Ok(TaskOutcome::Skipped("no_raster".to_string()));
    };

    let routes = store.list_saved_routes().await?;
    let now = Utc::now();
    let mut updated = 0usize;

    for route in &routes {
        let (mean, max) = match sample_upes_along_line_mean_max(
            Some(path),
            &route.line_coords(),
            SAMPLE_STEP_M,
            0.5,
        ) {
            Ok(pair) => pair,
            Err(e) => {
                warn!(route_id = %route.id, error = %e, "route UPES sampling failed");
                continue;
            }
        };

        if let Err(e) = store
            .insert_route_exposure_history(route.id, now, mean, Some(max), "upes")
            .await
        {
            warn!(route_id = %route.id, error = %e, "route exposure history insert failed");
            continue;
        }
        if let Err(e) = store.update_route_upes_score(route.id, mean, now).await {
            warn!(route_id = %route.id, error = %e, "route UPES score update failed");
            continue;
        }
        updated += 1;
    }

    info!(routes_updated = updated, total_routes = routes.len(), "recomputed saved-route UPES scores");
    Ok(TaskOutcome::Ok(format!("{updated} routes updated")))
}
