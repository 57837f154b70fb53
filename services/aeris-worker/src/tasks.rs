//! Task entry points wrapping each scheduled operation into a `TaskOutcome`.
//! Every function here is infallible from the scheduler's point of view:
//! internal errors are caught and reported as `TaskOutcome::Failed`, never
//! propagated past the task boundary.

use crate::state::AppState;
use aeris_common::TaskOutcome;
use aeris_ingestion::driver::run_hourly_ingest;
use aeris_raster::{latest_final_score_path, write_upes_log, write_upes_rasters, UpesLogRecord};
use aeris_upes::{aggregate_pollution_grid_to_regular, compute_upes_scores, Modifiers};
use chrono::Duration as ChronoDuration;
use tracing::{info, instrument, warn};

/// :00 — satellite ingestion for every TEMPO gas. Self-chains UPES compute
/// on success, since UPES compute is also triggerable directly on
/// ingestion completion.
#[instrument(skip(state))]
pub async fn run_ingestion(state: &AppState) -> TaskOutcome {
    if !state.config.features.persist_pollution_grid {
        return TaskOutcome::Skipped("persist_pollution_grid disabled".to_string());
    }

    let mut cache = state.cache.lock().await;
    let result = run_hourly_ingest(&state.http_client, &state.store, &mut cache, &state.config.ingestion).await;
    drop(cache);

    match result {
        Ok(summary) => {
            let outcome = TaskOutcome::Ok(format!(
                "{} cells inserted across {} gases",
                summary.inserted_total,
                summary.gases.len()
            ));
            if summary.should_chain_recompute() {
                info!("ingestion inserted new cells, self-chaining UPES compute");
                let chained = run_upes_compute(state).await;
                state.record_task("upes_compute_chained", &chained).await;
            }
            outcome
        }
        Err(e) => {
            warn!(error = %e, "hourly ingestion failed");
            TaskOutcome::Failed(e.to_string())
        }
    }
}

/// :15 — aggregate the latest hour of pollution-grid observations into a
/// regular grid, score it, and write the UPES rasters + log.
#[instrument(skip(state))]
pub async fn run_upes_compute(state: &AppState) -> TaskOutcome {
    if !state.config.features.upes_enabled {
        return TaskOutcome::Skipped("upes_enabled disabled".to_string());
    }

    let upes_cfg = &state.config.upes;

    let end_time = match state.store.max_timestamp().await {
        Ok(Some(ts)) => ts,
        Ok(None) => {
            info!("no pollution grid data; skipping UPES compute");
            return TaskOutcome::Skipped("no_data".to_string());
        }
        Err(e) => {
            warn!(error = %e, "failed to read latest pollution grid timestamp");
            return TaskOutcome::Failed(e.to_string());
        }
    };
    let start_time = end_time - ChronoDuration::hours(1);

    let grids = match aggregate_pollution_grid_to_regular(
        &state.store,
        (start_time, end_time),
        upes_cfg.bbox,
        upes_cfg.resolution_deg,
    )
    .await
    {
        Ok(g) => g,
        Err(e) => {
            warn!(error = %e, "UPES aggregation failed");
            return TaskOutcome::Failed(e.to_string());
        }
    };

    if let Err(e) = aeris_raster::ensure_output_dirs(&upes_cfg.output_dir) {
        warn!(error = %e, "failed to create UPES output directories");
        return TaskOutcome::Failed(e.to_string());
    }

    let previous = latest_final_score_path(&upes_cfg.output_dir)
        .and_then(|path| aeris_raster::read_band1(&path).ok());

    let scores = {
        let spec = grids.values().next().map(|g| g.spec);
        // `previous.data` comes back from `read_band1` in the GeoTIFF's own
        // north-up row order; flip it back to the grid's south-up row order
        // before indexing it positionally against the current hour's arrays,
        // or the EMA would blend every cell with its vertical mirror.
        let previous_final: Option<Vec<f32>> = previous.as_ref().and_then(|band| match spec {
            Some(s) if band.data.len() == s.len() => {
                Some(aeris_raster::flip_rows(&band.data, s.nx, s.ny))
            }
            _ => None,
        });
        compute_upes_scores(&grids, Modifiers::default(), previous_final.as_deref(), upes_cfg.ema_lambda)
    };

    match write_upes_rasters(&upes_cfg.output_dir, start_time, &scores.satellite_score, &scores.final_score, &scores.spec) {
        Ok(_) => {
            let record = UpesLogRecord::new(
                start_time,
                Vec::new(),
                Modifiers::default().hdf,
                Modifiers::default().wtf,
                Modifiers::default().tf,
                scores.satellite_score_mean,
                scores.final_score_mean,
            );
            if let Err(e) = write_upes_log(&upes_cfg.output_dir, start_time, &record) {
                warn!(error = %e, "failed to write UPES log");
            }
            TaskOutcome::Ok(format!("final_score_mean={:.4}", scores.final_score_mean))
        }
        Err(e) => {
            warn!(error = %e, "failed to write UPES rasters");
            TaskOutcome::Failed(e.to_string())
        }
    }
}

/// :20 — resample every saved route against the latest raster and,
/// independently, recompute the legacy blended score.
#[instrument(skip(state))]
pub async fn run_route_scoring(state: &AppState) -> (TaskOutcome, TaskOutcome) {
    let raster_path = latest_final_score_path(&state.config.upes.output_dir);

    let scoring = match aeris_alerts::run_route_upes_scoring(&state.store, raster_path.as_deref()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "saved-route UPES scoring failed");
            TaskOutcome::Failed(e.to_string())
        }
    };

    let legacy = match aeris_alerts::recompute_legacy_scores(&state.store).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "legacy route score recompute failed");
            TaskOutcome::Failed(e.to_string())
        }
    };

    (scoring, legacy)
}

/// :25 — evaluate alert detectors for every saved route and dispatch the
/// webhook batch.
#[instrument(skip(state))]
pub async fn run_alerts(state: &AppState) -> TaskOutcome {
    let weather = aeris_alerts::NoWeatherProvider;
    match aeris_alerts::run_alert_pipeline(
        &state.store,
        &weather,
        &state.http_client,
        state.config.alerts.webhook_url.as_deref(),
        state.config.features.alerts_enabled,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "alert pipeline failed");
            TaskOutcome::Failed(e.to_string())
        }
    }
}
