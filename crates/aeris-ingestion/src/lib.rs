//! Satellite broker client and hourly ingestion driver (component C) for
//! the AERIS exposure platform.

pub mod auth;
pub mod client;
pub mod collections;
pub mod config;
pub mod driver;
pub mod url;

pub use client::SubmitOutcome;
pub use collections::collection_id;
pub use config::{BrokerConfig, IngestionConfig, RetryConfig};
pub use driver::{run_hourly_ingest, GasIngestOutcome, HourlyIngestSummary};
pub use url::build_tempo_rangeset_url;
