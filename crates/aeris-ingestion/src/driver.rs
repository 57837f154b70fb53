//! Ingestion driver (component C): per-gas Harmony fetch, optional audit
//! upload, GeoTIFF normalization, and bulk insert into the spatial store.

use crate::client::{download_to_temp_file, submit_request, wait_for_job, write_temp_tiff, SubmitOutcome};
use crate::collections::{collection_id, DEFAULT_VARIABLE};
use crate::config::IngestionConfig;
use crate::url::build_tempo_rangeset_url;
use crate::{auth, client};
use aeris_common::{AerisResult, Gas, TaskOutcome};
use aeris_raster::geotiff_to_grid_cells;
use aeris_storage::cache::{key_last_update_marker, CacheAdapter, TTL_LAST_UPDATE_MARKER};
use aeris_storage::store::SpatialStore;
use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

#[derive(Debug)]
pub struct GasIngestOutcome {
    pub gas: Gas,
    pub outcome: TaskOutcome,
    pub cells_inserted: usize,
}

#[derive(Debug)]
pub struct HourlyIngestSummary {
    pub timestamp: DateTime<Utc>,
    pub gases: Vec<GasIngestOutcome>,
    pub inserted_total: usize,
}

impl HourlyIngestSummary {
    pub fn should_chain_recompute(&self) -> bool {
        self.inserted_total > 0
    }
}

/// Fetch one gas's GeoTIFF for the given window, handling all three broker
/// response shapes (redirect-to-job, synchronous binary, JSON data link).
#[instrument(skip(client, config), fields(gas = %gas))]
pub async fn fetch_tempo_geotiff(
    client: &Client,
    config: &IngestionConfig,
    gas: Gas,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> AerisResult<PathBuf> {
    let token = auth::get_bearer_token(client, &config.broker).await?;
    let url = build_tempo_rangeset_url(
        &config.broker.harmony_base_url,
        collection_id(gas),
        DEFAULT_VARIABLE,
        config.bbox,
        start_time,
        end_time,
    );
    info!(url = %url, "submitting broker coverage request");
    let outcome = submit_request(client, &url, token.as_deref(), &config.broker.harmony_base_url, &config.retry).await?;

    match outcome {
        SubmitOutcome::SyncBytes(bytes) => write_temp_tiff(&bytes),
        SubmitOutcome::DataLink(href) => download_to_temp_file(client, &href, token.as_deref()).await,
        SubmitOutcome::AsyncJob(job_url) => {
            let status = wait_for_job(client, &job_url, token.as_deref(), &config.retry).await?;
            let href = status
                .get("links")
                .and_then(|v| v.as_array())
                .and_then(|links| {
                    links
                        .iter()
                        .find(|l| l.get("rel").and_then(|v| v.as_str()) == Some("data"))
                })
                .and_then(|l| l.get("href"))
                .and_then(|v| v.as_str())
                .ok_or_else(|| aeris_common::AerisError::NoData("completed job named no data link".into()))?;
            download_to_temp_file(client, href, token.as_deref()).await
        }
    }
}

async fn upload_audit_copy(config: &IngestionConfig, path: &Path, gas: Gas, timestamp: DateTime<Utc>) {
    let Some(bucket_url) = &config.audit_bucket_url else {
        return;
    };
    let key = format!(
        "audit/geotiff/{}/{}_{:02}.tif",
        timestamp.format("%Y-%m-%d"),
        gas.as_str(),
        timestamp.hour()
    );
    match object_store::parse_url(&match url::Url::parse(bucket_url) {
        Ok(u) => u,
        Err(e) => {
            warn!(error = %e, "audit bucket URL unparsable, skipping audit upload");
            return;
        }
    }) {
        Ok((store, base_path)) => {
            let bytes = match tokio::fs::read(path).await {
                Ok(b) => b,
                Err(e) => {
                    warn!(error = %e, "failed reading GeoTIFF for audit upload");
                    return;
                }
            };
            let full_path = base_path.child(key.as_str());
            if let Err(e) = store.put(&full_path, bytes.into()).await {
                warn!(error = %e, "audit upload failed");
            } else {
                info!(key = %key, "uploaded GeoTIFF audit copy");
            }
        }
        Err(e) => warn!(error = %e, "audit bucket URL not resolvable to a store"),
    }
}

/// Run one hour's ingest across every TEMPO gas: a gas that fails is
/// skipped, subsequent gases still run, and the last-update marker and
/// recompute chain fire only if at least one cell was inserted.
#[instrument(skip(client, store, cache, config))]
pub async fn run_hourly_ingest(
    client: &Client,
    store: &SpatialStore,
    cache: &mut CacheAdapter,
    config: &IngestionConfig,
) -> AerisResult<HourlyIngestSummary> {
    let end_time = Utc::now()
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or_else(Utc::now);
    let start_time = end_time - ChronoDuration::hours(1);

    let mut gases = Vec::new();
    let mut inserted_total = 0usize;

    for gas in Gas::ALL {
        let outcome = ingest_one_gas(client, store, config, gas, start_time, end_time).await;
        inserted_total += outcome.cells_inserted;
        gases.push(outcome);
    }

    if inserted_total > 0 {
        cache
            .setex(&key_last_update_marker(), TTL_LAST_UPDATE_MARKER, &start_time.to_rfc3339())
            .await;
    }

    Ok(HourlyIngestSummary {
        timestamp: start_time,
        gases,
        inserted_total,
    })
}

async fn ingest_one_gas(
    client: &Client,
    store: &SpatialStore,
    config: &IngestionConfig,
    gas: Gas,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> GasIngestOutcome {
    let path = match fetch_tempo_geotiff(client, config, gas, start_time, end_time).await {
        Ok(path) => path,
        Err(e) if !e.retryable() => {
            warn!(gas = %gas, error = %e, "skipping gas: upstream has no data for this window");
            return GasIngestOutcome {
                gas,
                outcome: TaskOutcome::Skipped(e.to_string()),
                cells_inserted: 0,
            };
        }
        Err(e) => {
            warn!(gas = %gas, error = %e, "gas ingest failed");
            return GasIngestOutcome {
                gas,
                outcome: TaskOutcome::Failed(e.to_string()),
                cells_inserted: 0,
            };
        }
    };

    upload_audit_copy(config, &path, gas, start_time).await;

    let result = (|| async {
        let cells = geotiff_to_grid_cells(&path, gas, start_time, None)?;
        let new_cells: Vec<_> = cells
            .into_iter()
            .map(|c| aeris_storage::store::NewGridCell {
                timestamp: c.timestamp,
                gas: c.gas,
                polygon_wkt: c.polygon_wkt,
                pollution_value: c.pollution_value,
                severity_level: c.severity_level,
            })
            .collect();
        store.bulk_insert_cells(&new_cells).await
    })()
    .await;

    let _ = tokio::fs::remove_file(&path).await;

    match result {
        Ok(count) => {
            info!(gas = %gas, cells = count, "inserted pollution grid cells");
            GasIngestOutcome {
                gas,
                outcome: TaskOutcome::Ok(format!("{count} cells inserted")),
                cells_inserted: count,
            }
        }
        Err(e) => {
            warn!(gas = %gas, error = %e, "normalize/insert failed");
            GasIngestOutcome {
                gas,
                outcome: TaskOutcome::Failed(e.to_string()),
                cells_inserted: 0,
            }
        }
    }
}
