//! Alert detection and the per-route alert pipeline (components J/K) for
//! the AERIS exposure platform, plus the independently scheduled legacy
//! blended-score task.

pub mod detector;
pub mod legacy;
pub mod pipeline;
pub mod route_scoring;
pub mod sensitivity;
pub mod webhook;

pub use detector::{
    check_hazard, check_route_deterioration, check_time_based, check_wind_shift,
    run_detection, DetectedAlert, DetectionInputs, WindObservation,
};
pub use legacy::recompute_legacy_scores;
pub use pipeline::{run_alert_pipeline, NoWeatherProvider, WeatherProvider};
pub use route_scoring::run_route_upes_scoring;
pub use sensitivity::{sensitivity_label, sensitivity_scale};
pub use webhook::{alert_message, WebhookAlert};
