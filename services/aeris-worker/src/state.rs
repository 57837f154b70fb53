//! Shared application state: the spatial store, cache adapter, HTTP client,
//! and per-task run bookkeeping the status server reports.

use crate::config::WorkerConfig;
use aeris_common::{AerisResult, TaskOutcome};
use aeris_storage::cache::CacheAdapter;
use aeris_storage::store::SpatialStore;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// The last outcome recorded for one named scheduled task, for the status
/// endpoint.
#[derive(Debug, Clone)]
pub struct TaskRunRecord {
    pub task: String,
    pub ran_at: DateTime<Utc>,
    pub outcome: String,
}

impl TaskRunRecord {
    pub fn from_outcome(task: &str, outcome: &TaskOutcome) -> Self {
        let outcome = match outcome {
            TaskOutcome::Ok(detail) => format!("ok: {detail}"),
            TaskOutcome::Skipped(reason) => format!("skipped: {reason}"),
            TaskOutcome::Failed(error) => format!("failed: {error}"),
        };
        Self {
            task: task.to_string(),
            ran_at: Utc::now(),
            outcome,
        }
    }
}

pub struct AppState {
    pub store: SpatialStore,
    /// `CacheAdapter`'s methods take `&mut self`; tasks only ever hold the
    /// lock for a single short redis round trip.
    pub cache: Mutex<CacheAdapter>,
    pub http_client: Client,
    pub config: WorkerConfig,
    last_runs: Mutex<HashMap<String, TaskRunRecord>>,
}

impl AppState {
    pub async fn new(config: WorkerConfig) -> AerisResult<Self> {
        let store = SpatialStore::connect(&config.database_url).await?;
        store.migrate().await?;
        let cache = CacheAdapter::connect(config.redis_url.as_deref()).await?;
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| aeris_common::AerisError::Fatal(format!("http client build failed: {e}")))?;

        Ok(Self {
            store,
            cache: Mutex::new(cache),
            http_client,
            config,
            last_runs: Mutex::new(HashMap::new()),
        })
    }

    pub async fn record_task(&self, task: &str, outcome: &TaskOutcome) {
        let record = TaskRunRecord::from_outcome(task, outcome);
        self.last_runs.lock().await.insert(task.to_string(), record);
    }

    pub async fn task_snapshot(&self) -> Vec<TaskRunRecord> {
        self.last_runs.lock().await.values().cloned().collect()
    }
}
