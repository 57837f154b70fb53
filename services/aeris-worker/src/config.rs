//! Scheduler configuration: feature flags, UPES grid/EMA settings, and the
//! alert webhook, read from environment variables via local
//! `parse_bool`/`env_f64` helpers for the settings that have no natural
//! field on the top-level `clap::Parser` struct in `main.rs`.

use aeris_common::{AerisError, AerisResult, BoundingBox};
use aeris_ingestion::config::IngestionConfig;
use std::path::PathBuf;

/// Independently toggles each of the four scheduled tasks, in addition
/// to ingestion's and the alert pipeline's own internal checks.
#[derive(Debug, Clone, Copy)]
pub struct FeatureFlags {
    pub persist_pollution_grid: bool,
    pub upes_enabled: bool,
    /// Routing (components G/H) is an on-demand service, not a scheduled
    /// task; this flag is carried for forward configuration compatibility
    /// but does not gate anything `aeris-worker` schedules today.
    pub route_optimization_enabled: bool,
    pub alerts_enabled: bool,
}

impl FeatureFlags {
    fn from_env() -> Self {
        Self {
            persist_pollution_grid: parse_bool("PERSIST_POLLUTION_GRID", true),
            upes_enabled: parse_bool("UPES_ENABLED", true),
            route_optimization_enabled: parse_bool("ROUTE_OPTIMIZATION_ENABLED", true),
            alerts_enabled: parse_bool("ALERTS_ENABLED", true),
        }
    }
}

/// UPES aggregation/scoring settings.
#[derive(Debug, Clone)]
pub struct UpesConfig {
    pub bbox: BoundingBox,
    pub resolution_deg: f64,
    pub ema_lambda: Option<f64>,
    pub output_dir: PathBuf,
}

impl UpesConfig {
    fn from_env() -> Self {
        let bbox = BoundingBox::new(
            env_f64("UPES_BBOX_WEST", -125.0),
            env_f64("UPES_BBOX_SOUTH", 24.0),
            env_f64("UPES_BBOX_EAST", -66.0),
            env_f64("UPES_BBOX_NORTH", 50.0),
        );
        Self {
            bbox,
            resolution_deg: env_f64("UPES_RESOLUTION_DEG", 0.05),
            ema_lambda: std::env::var("UPES_EMA_LAMBDA").ok().and_then(|v| v.parse().ok()),
            output_dir: std::env::var("UPES_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/upes")),
        }
    }
}

/// Alert pipeline settings not already covered by the detector thresholds
/// (those are fixed constants in `aeris-alerts::detector`).
#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub webhook_url: Option<String>,
}

impl AlertConfig {
    fn from_env() -> Self {
        Self {
            webhook_url: std::env::var("ALERT_WEBHOOK_URL").ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
    /// Stored for forward compatibility; no concrete weather collaborator
    /// is wired in this build (no HTTP weather fetch is implemented), so
    /// `aeris-alerts::NoWeatherProvider` is used regardless of this value.
    pub weather_api_key: Option<String>,
    pub features: FeatureFlags,
    pub upes: UpesConfig,
    pub alerts: AlertConfig,
    pub ingestion: IngestionConfig,
}

impl WorkerConfig {
    pub fn from_env(database_url: String, redis_url: Option<String>, weather_api_key: Option<String>) -> Self {
        Self {
            database_url,
            redis_url,
            weather_api_key,
            features: FeatureFlags::from_env(),
            upes: UpesConfig::from_env(),
            alerts: AlertConfig::from_env(),
            ingestion: IngestionConfig::from_env(),
        }
    }

    /// Fail-fast startup checks: a hard failure here aborts the
    /// process before the scheduler or status server starts.
    pub fn validate(&self) -> AerisResult<()> {
        let b = &self.upes.bbox;
        if !b.is_valid() {
            return Err(AerisError::InvalidConfig(format!(
                "UPES bbox is degenerate: west={} east={} south={} north={}",
                b.west, b.east, b.south, b.north
            )));
        }
        if self.upes.resolution_deg <= 0.0 {
            return Err(AerisError::InvalidConfig(format!(
                "UPES_RESOLUTION_DEG must be > 0, got {}",
                self.upes.resolution_deg
            )));
        }
        if let Some(lambda) = self.upes.ema_lambda {
            if !(lambda > 0.0 && lambda <= 1.0) {
                return Err(AerisError::InvalidConfig(format!(
                    "UPES_EMA_LAMBDA must be in (0, 1], got {lambda}"
                )));
            }
        }
        if let Some(url) = &self.alerts.webhook_url {
            if url::Url::parse(url).is_err() {
                return Err(AerisError::InvalidConfig(format!(
                    "ALERT_WEBHOOK_URL is not a well-formed URL: {url}"
                )));
            }
        }
        Ok(())
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_bbox_is_rejected() {
        let mut cfg = WorkerConfig::from_env("postgres://localhost/aeris".into(), None, None);
        cfg.upes.bbox = BoundingBox::new(-66.0, 24.0, -125.0, 50.0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn out_of_range_ema_lambda_is_rejected() {
        let mut cfg = WorkerConfig::from_env("postgres://localhost/aeris".into(), None, None);
        cfg.upes.ema_lambda = Some(1.5);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn default_config_validates() {
        let cfg = WorkerConfig::from_env("postgres://localhost/aeris".into(), None, None);
        assert!(cfg.validate().is_ok());
    }
}
