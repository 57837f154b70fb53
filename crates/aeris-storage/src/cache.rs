//! Redis-backed cache adapter: keyed JSON get/setex with per-family TTLs.
//!
//! An absent backend silently no-ops: `get` reports a miss and `set` is a
//! no-op, rather than failing the caller, matching the cache-aside pattern
//! used throughout the alert and routing pipelines.

use aeris_common::{AerisError, AerisResult};
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

pub const TTL_WEATHER: Duration = Duration::from_secs(600);
pub const TTL_POLLUTANT_MOVEMENT: Duration = Duration::from_secs(600);
pub const TTL_HOTSPOTS: Duration = Duration::from_secs(300);
pub const TTL_ROUTE_EXPOSURE: Duration = Duration::from_secs(300);
pub const TTL_ROUTE_OPT: Duration = Duration::from_secs(600);
pub const TTL_LAST_UPDATE_MARKER: Duration = Duration::from_secs(3600);

/// An optional Redis connection; `None` when no cache backend is
/// configured, in which case every operation is a silent no-op.
pub struct CacheAdapter {
    conn: Option<MultiplexedConnection>,
}

impl CacheAdapter {
    /// Connect to Redis. Returns an adapter with no backend (not an error)
    /// when `redis_url` is `None`.
    pub async fn connect(redis_url: Option<&str>) -> AerisResult<Self> {
        let Some(url) = redis_url else {
            return Ok(Self { conn: None });
        };

        let client = Client::open(url)
            .map_err(|e| AerisError::Cache(format!("redis connection failed: {}", e)))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AerisError::Cache(format!("redis connection failed: {}", e)))?;

        Ok(Self { conn: Some(conn) })
    }

    pub fn disabled() -> Self {
        Self { conn: None }
    }

    /// Get and JSON-deserialize a value; any backend error or miss is a
    /// `None`, matching the original `cache_get`'s silent-degrade policy.
    pub async fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let conn = self.conn.as_mut()?;
        let raw: Option<String> = conn.get(key).await.ok()?;
        raw.and_then(|s| serde_json::from_str(&s).ok())
    }

    /// JSON-serialize and SETEX a value. Silently no-ops on any failure or
    /// absent backend.
    pub async fn setex<T: Serialize>(&mut self, key: &str, ttl: Duration, value: &T) {
        let Some(conn) = self.conn.as_mut() else {
            return;
        };
        let Ok(json) = serde_json::to_string(value) else {
            return;
        };
        let _: Result<(), _> = conn.set_ex(key, json, ttl.as_secs()).await;
    }
}

/// `weather:{lat}:{lon}:{days}`
pub fn key_weather(lat: f64, lon: f64, days: u32) -> String {
    format!("weather:{:.4}:{:.4}:{}", lat, lon, days)
}

/// `pollutant_movement:{lat}:{lon}`
pub fn key_pollutant_movement(lat: f64, lon: f64) -> String {
    format!("pollutant_movement:{:.4}:{:.4}", lat, lon)
}

/// `hotspots:{lat}:{lon}:{radius}:{hash(sorted gases)}`. Reserved for a
/// future hotspot-detection module; the key namespace is stable today even
/// though no producer writes through it yet.
pub fn key_hotspots(lat: f64, lon: f64, radius_km: f64, gases: &[&str]) -> String {
    let mut sorted: Vec<&str> = gases.to_vec();
    sorted.sort_unstable();
    let mut hasher = Sha256::new();
    hasher.update(sorted.join(",").as_bytes());
    let digest = hasher.finalize();
    let hex = digest.iter().map(|b| format!("{:02x}", b)).collect::<String>();
    format!(
        "hotspots:{:.4}:{:.4}:{:.1}:{}",
        lat,
        lon,
        radius_km,
        &hex[..12]
    )
}

/// `route_exposure:{route_id}`
pub fn key_route_exposure(route_id: &str) -> String {
    format!("route_exposure:{}", route_id)
}

/// `route_opt:{start}:{end}:{mode}`
pub fn key_route_optimized(start: &str, end: &str, mode: &str) -> String {
    format!("route_opt:{}:{}:{}", start, end, mode)
}

/// `tempo:last_update` marker, published after a successful ingestion cycle.
pub fn key_last_update_marker() -> &'static str {
    "tempo:last_update"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_hotspots_is_order_independent() {
        let a = key_hotspots(34.0, -118.0, 5.0, &["NO2", "PM"]);
        let b = key_hotspots(34.0, -118.0, 5.0, &["PM", "NO2"]);
        assert_eq!(a, b);
    }

    #[test]
    fn disabled_cache_get_is_miss() {
        let mut cache = CacheAdapter::disabled();
        let fut = cache.get::<serde_json::Value>("any");
        assert!(tokio_test::block_on(fut).is_none());
    }
}
