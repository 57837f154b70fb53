//! Alert pipeline (component K, steps 2-4): detector evaluation,
//! persistence, and webhook dispatch against each route's already-scored
//! UPES history. Step 1 (resampling the raster and updating route scores)
//! is the separate `route_scoring::run_route_upes_scoring` task, scheduled
//! at its own :20 cron slot rather than inline here, so a slow UPES
//! compute never blocks alert evaluation.

use crate::detector::{run_detection, DetectionInputs, WindObservation};
use crate::webhook::{self, WebhookAlert};
use aeris_common::model::AlertLogEntry;
use aeris_common::{AerisResult, TaskOutcome};
use aeris_storage::store::SpatialStore;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

const RECENT_HISTORY_WINDOW_HOURS: i64 = 24;

/// External collaborator: current weather at a point. AERIS does not fetch
/// weather itself; a real deployment injects an HTTP-backed implementation.
/// Failures are treated as "no wind data" by the pipeline, not a hard error.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_wind(&self, lat: f64, lon: f64) -> AerisResult<WindObservation>;
}

/// A `WeatherProvider` that never has data, for deployments running the
/// pipeline without a weather collaborator configured — wind-shift alerts
/// simply never fire when there is no wind observation to compare against.
pub struct NoWeatherProvider;

#[async_trait]
impl WeatherProvider for NoWeatherProvider {
    async fn current_wind(&self, _lat: f64, _lon: f64) -> AerisResult<WindObservation> {
        Err(aeris_common::AerisError::NoData("no weather provider configured".into()))
    }
}

/// Run one alert pipeline cycle over every saved route.
///
/// Reads each route's last-known UPES score and history; it does not
/// resample the raster itself (that's `route_scoring::run_route_upes_scoring`).
/// A route with no score on file yet is skipped. The pollution-source point
/// for the wind-shift detector is not selectable from any persisted state
/// (no hotspot detector exists) so it is always evaluated as absent.
#[instrument(skip(store, weather, http_client), fields(alerts_enabled))]
pub async fn run_alert_pipeline(
    store: &SpatialStore,
    weather: &dyn WeatherProvider,
    http_client: &Client,
    webhook_url: Option<&str>,
    alerts_enabled: bool,
) -> AerisResult<TaskOutcome> {
    if !alerts_enabled {
        return Ok(TaskOutcome::Skipped("disabled".to_string()));
    }

    let routes = store.list_saved_routes().await?;
    let now = Utc::now();
    let since_24h = now - ChronoDuration::hours(RECENT_HISTORY_WINDOW_HOURS);

    let mut webhook_batch: Vec<WebhookAlert> = Vec::new();
    let mut alert_count = 0usize;

    for route in &routes {
        let Some(user) = store.get_user(route.user_id).await? else {
            continue;
        };

        let Some(current_upes) = route.last_upes_score else {
            continue;
        };

        let history = store.recent_history(route.id, 2).await?;
        let max_upes = history
            .first()
            .and_then(|h| h.max_upes_along_route)
            .unwrap_or(current_upes);
        let prev_upes = history.get(1).map(|h| h.mean_upes);
        let recent_min_upes = store.recent_min_mean_upes(route.id, since_24h).await?;

        let mid = route.midpoint();
        let wind = match weather.current_wind(mid.1, mid.0).await {
            Ok(w) => Some(w),
            Err(e) => {
                debug!(route_id = %route.id, error = %e, "no weather for alert pipeline");
                None
            }
        };

        let inputs = DetectionInputs {
            current_upes,
            max_upes,
            prev_upes,
            recent_min_upes,
            sensitivity_level: Some(user.exposure_sensitivity_level),
            wind,
            route_mid: Some(mid),
            // No hotspot detector exists to supply a source point; the
            // wind-shift detector is therefore never evaluated today.
            source: None,
        };

        let fired = run_detection(&inputs);
        if fired.is_empty() {
            continue;
        }
        let channels = user.notification_preferences.enabled_channels();

        for alert in fired {
            let entry = AlertLogEntry {
                id: Uuid::new_v4(),
                user_id: user.id,
                route_id: route.id,
                kind: alert.kind,
                score_before: alert.score_before,
                score_after: alert.score_after,
                threshold: alert.threshold,
                metadata: alert.metadata.clone(),
                created_at: now,
                notified_channels: channels.clone(),
            };
            if let Err(e) = store.insert_alert_log(&entry).await {
                warn!(route_id = %route.id, error = %e, "alert log insert failed");
                continue;
            }
            alert_count += 1;
            webhook_batch.push(WebhookAlert {
                alert_id: entry.id,
                user_id: entry.user_id,
                route_id: entry.route_id,
                alert_type: entry.kind.as_str().to_string(),
                message: webhook::alert_message(entry.kind.as_str(), entry.score_before, entry.score_after),
                score_before: entry.score_before,
                score_after: entry.score_after,
                channels: entry.notified_channels,
            });
        }
    }

    if let Some(url) = webhook_url {
        webhook::dispatch(http_client, url, webhook_batch, now).await;
    }

    Ok(TaskOutcome::Ok(format!("{alert_count} alerts logged")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_weather_provider_reports_no_data() {
        let provider = NoWeatherProvider;
        let result = tokio_test::block_on(provider.current_wind(34.0, -118.0));
        assert!(result.is_err());
    }
}
