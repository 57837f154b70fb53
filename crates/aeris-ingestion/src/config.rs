//! Ingestion driver configuration: broker endpoints, credentials, and the
//! bounding box polled every hour.

use aeris_common::BoundingBox;

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub harmony_base_url: String,
    pub ursa_token_url: String,
    pub ursa_tokens_url: String,
    pub bearer_token: Option<String>,
    pub earthdata_username: Option<String>,
    pub earthdata_password: Option<String>,
}

impl BrokerConfig {
    pub fn from_env() -> Self {
        Self {
            harmony_base_url: std::env::var("HARMONY_BASE_URL")
                .unwrap_or_else(|_| "https://harmony.earthdata.nasa.gov".to_string()),
            ursa_token_url: std::env::var("URSA_TOKEN_URL")
                .unwrap_or_else(|_| "https://urs.earthdata.nasa.gov/api/users/token".to_string()),
            ursa_tokens_url: std::env::var("URSA_TOKENS_URL")
                .unwrap_or_else(|_| "https://urs.earthdata.nasa.gov/api/users/tokens".to_string()),
            bearer_token: std::env::var("BEARER_TOKEN").ok(),
            earthdata_username: std::env::var("EARTHDATA_USERNAME").ok(),
            earthdata_password: std::env::var("EARTHDATA_PASSWORD").ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_secs: u64,
    pub poll_interval_secs: u64,
    pub max_wait_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 10,
            poll_interval_secs: 10,
            max_wait_secs: 3600,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub broker: BrokerConfig,
    pub retry: RetryConfig,
    pub bbox: BoundingBox,
    /// Prefix under the audit bucket that completed GeoTIFFs are mirrored to
    /// (`None` disables the audit upload).
    pub audit_bucket_url: Option<String>,
}

impl IngestionConfig {
    pub fn from_env() -> Self {
        let bbox = BoundingBox::new(
            env_f64("TEMPO_BBOX_WEST", -125.0),
            env_f64("TEMPO_BBOX_SOUTH", 24.0),
            env_f64("TEMPO_BBOX_EAST", -66.0),
            env_f64("TEMPO_BBOX_NORTH", 50.0),
        );
        Self {
            broker: BrokerConfig::from_env(),
            retry: RetryConfig::default(),
            bbox,
            audit_bucket_url: std::env::var("AUDIT_BUCKET_URL").ok(),
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
