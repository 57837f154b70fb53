//! Domain model shared by the storage, routing, and alert crates.

use crate::gas::{Gas, Severity};
use crate::mode::Mode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A channel a user can be notified on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Push,
    InApp,
}

/// Per-user notification channel preferences, mirroring the JSONB
/// `notification_preferences` column. `in_app` defaults to enabled when the
/// key is absent, matching the original preference-resolution behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(default)]
    pub email: bool,
    #[serde(default)]
    pub push: bool,
    #[serde(default = "default_true")]
    pub in_app: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: false,
            push: false,
            in_app: true,
        }
    }
}

impl NotificationPreferences {
    /// Resolve to the concrete list of channels to notify on, falling back
    /// to `[in_app]` when every channel is disabled.
    pub fn enabled_channels(&self) -> Vec<NotificationChannel> {
        let mut channels = Vec::new();
        if self.email {
            channels.push(NotificationChannel::Email);
        }
        if self.push {
            channels.push(NotificationChannel::Push);
        }
        if self.in_app {
            channels.push(NotificationChannel::InApp);
        }
        if channels.is_empty() {
            channels.push(NotificationChannel::InApp);
        }
        channels
    }
}

/// A registered user. Exposure sensitivity level is in [1, 5] and feeds the
/// alert sensitivity scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub notification_preferences: NotificationPreferences,
    pub preferred_activity: Mode,
    pub exposure_sensitivity_level: u8,
}

/// A route a user has saved for repeated exposure scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedRoute {
    pub id: Uuid,
    pub user_id: Uuid,
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub dest_lat: f64,
    pub dest_lon: f64,
    pub activity_type: Option<Mode>,
    /// Legacy blended score, maintained by the separate legacy-scoring task.
    pub last_computed_score: Option<f64>,
    pub last_updated_at: Option<DateTime<Utc>>,
    /// UPES-based mean exposure, maintained by the route scoring task.
    pub last_upes_score: Option<f64>,
    pub last_upes_updated_at: Option<DateTime<Utc>>,
}

impl SavedRoute {
    pub fn is_valid(&self) -> bool {
        self.origin_lat.abs() <= 90.0
            && self.dest_lat.abs() <= 90.0
            && self.origin_lon.abs() <= 180.0
            && self.dest_lon.abs() <= 180.0
    }

    /// The straight-line endpoint pair used by line-intersect queries and
    /// the legacy scoring task.
    pub fn line_coords(&self) -> [(f64, f64); 2] {
        [
            (self.origin_lon, self.origin_lat),
            (self.dest_lon, self.dest_lat),
        ]
    }

    pub fn midpoint(&self) -> (f64, f64) {
        (
            (self.origin_lon + self.dest_lon) / 2.0,
            (self.origin_lat + self.dest_lat) / 2.0,
        )
    }
}

/// One observation of one gas at one hour over one geographic polygon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollutionGridCell {
    pub timestamp: DateTime<Utc>,
    pub gas: Gas,
    pub polygon_wkt: String,
    pub pollution_value: f64,
    pub severity_level: Severity,
}

/// One sampling of a route against a UPES raster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteExposureHistoryEntry {
    pub id: Uuid,
    pub route_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub mean_upes: f64,
    pub max_upes_along_route: Option<f64>,
    pub score_source: String,
}

/// The kind of condition an alert detector fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    RouteDeterioration,
    Hazard,
    WindShift,
    TimeBased,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::RouteDeterioration => "route_deterioration",
            AlertKind::Hazard => "hazard",
            AlertKind::WindShift => "wind_shift",
            AlertKind::TimeBased => "time_based",
        }
    }
}

/// One emitted alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub route_id: Uuid,
    pub kind: AlertKind,
    pub score_before: Option<f64>,
    pub score_after: f64,
    pub threshold: f64,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub notified_channels: Vec<NotificationChannel>,
}

/// Audit record of one uploaded raster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetcdfObjectRecord {
    pub file_name: String,
    pub bucket_path: String,
    pub timestamp: DateTime<Utc>,
    pub gas: Gas,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_in_app_key_defaults_enabled() {
        let prefs: NotificationPreferences = serde_json::from_str("{}").unwrap();
        assert!(prefs.in_app);
        assert_eq!(
            prefs.enabled_channels(),
            vec![NotificationChannel::InApp]
        );
    }

    #[test]
    fn all_channels_disabled_falls_back_to_in_app() {
        let prefs = NotificationPreferences {
            email: false,
            push: false,
            in_app: false,
        };
        assert_eq!(
            prefs.enabled_channels(),
            vec![NotificationChannel::InApp]
        );
    }

    #[test]
    fn saved_route_validates_coordinate_bounds() {
        let mut route = SavedRoute {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            origin_lat: 34.0,
            origin_lon: -118.0,
            dest_lat: 35.0,
            dest_lon: -117.0,
            activity_type: None,
            last_computed_score: None,
            last_updated_at: None,
            last_upes_score: None,
            last_upes_updated_at: None,
        };
        assert!(route.is_valid());
        route.dest_lat = 91.0;
        assert!(!route.is_valid());
    }
}
