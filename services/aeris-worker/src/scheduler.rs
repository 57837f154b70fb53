//! Fixed UTC cron-style scheduler: triggers ingestion at :00, UPES compute
//! at :15, saved-route scoring at :20, and the alert pipeline at :25. One
//! task failing never blocks the next cron tick, and ticks are tracked per
//! (task, hour) so a slow tick doesn't fire the same task twice.

use crate::state::AppState;
use crate::tasks;
use chrono::{Timelike, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Ingestion,
    UpesCompute,
    RouteScoring,
    Alerts,
}

impl Slot {
    fn minute(self) -> u32 {
        match self {
            Slot::Ingestion => 0,
            Slot::UpesCompute => 15,
            Slot::RouteScoring => 20,
            Slot::Alerts => 25,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Slot::Ingestion => "ingestion",
            Slot::UpesCompute => "upes_compute",
            Slot::RouteScoring => "route_scoring",
            Slot::Alerts => "alerts",
        }
    }

    const ALL: [Slot; 4] = [Slot::Ingestion, Slot::UpesCompute, Slot::RouteScoring, Slot::Alerts];
}

pub struct Scheduler {
    state: Arc<AppState>,
    /// (slot, hour-of-last-run) so each slot fires at most once per hour.
    last_run_hour: std::collections::HashMap<Slot, u32>,
}

impl Scheduler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            last_run_hour: std::collections::HashMap::new(),
        }
    }

    /// Run every scheduled task once, in order, regardless of the clock —
    /// used for `--once` invocations and manual triggers.
    pub async fn run_all_once(&self) {
        self.fire(Slot::Ingestion).await;
        self.fire(Slot::UpesCompute).await;
        self.fire(Slot::RouteScoring).await;
        self.fire(Slot::Alerts).await;
    }

    /// Poll the clock forever, firing each slot the first time its minute
    /// mark is reached in a given hour.
    pub async fn run_forever(&mut self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            let now = Utc::now();
            let hour_key = now.format("%Y%m%d%H").to_string().parse::<u32>().unwrap_or(0);
            let minute = now.minute();

            for slot in Slot::ALL {
                if minute >= slot.minute() && self.last_run_hour.get(&slot) != Some(&hour_key) {
                    self.last_run_hour.insert(slot, hour_key);
                    self.fire(slot).await;
                }
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("shutting down scheduler");
                    break;
                }
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }

    async fn fire(&self, slot: Slot) {
        info!(task = slot.name(), "running scheduled task");
        match slot {
            Slot::Ingestion => {
                let outcome = tasks::run_ingestion(&self.state).await;
                self.state.record_task(slot.name(), &outcome).await;
            }
            Slot::UpesCompute => {
                let outcome = tasks::run_upes_compute(&self.state).await;
                self.state.record_task(slot.name(), &outcome).await;
            }
            Slot::RouteScoring => {
                let (scoring, legacy) = tasks::run_route_scoring(&self.state).await;
                self.state.record_task("route_upes_scoring", &scoring).await;
                self.state.record_task("legacy_score_recompute", &legacy).await;
            }
            Slot::Alerts => {
                let outcome = tasks::run_alerts(&self.state).await;
                self.state.record_task(slot.name(), &outcome).await;
            }
        }
    }
}
