//! Alert detector (component J): four independent detection rules run
//! against one route's current/historical UPES scores and local weather.

use aeris_common::geo::{angle_diff_deg, bearing_deg};
use aeris_common::model::AlertKind;
use crate::sensitivity::sensitivity_scale;
use serde_json::json;

pub const DEFAULT_DETERIORATION_BASE_PCT: f64 = 0.15;
pub const DEFAULT_HAZARD_THRESHOLD: f64 = 0.85;
pub const DEFAULT_WIND_SPEED_MIN_KPH: f64 = 5.0;
pub const DEFAULT_WIND_ANGLE_MAX_DEG: f64 = 45.0;
pub const DEFAULT_TIME_BASED_MARGIN: f64 = 0.15;

/// One fired detection, ready to persist as an `alert_log` row.
#[derive(Debug, Clone)]
pub struct DetectedAlert {
    pub kind: AlertKind,
    pub score_before: Option<f64>,
    pub score_after: f64,
    pub threshold: f64,
    pub metadata: serde_json::Value,
}

/// Wind observation at a route's midpoint, meteorological "from" convention.
#[derive(Debug, Clone, Copy)]
pub struct WindObservation {
    pub speed_kph: f64,
    pub from_deg: f64,
}

/// Fires when exposure worsened by at least `base_pct * sensitivity_scale`
/// relative to the previous sample. `prev_score <= 0` never fires (a zero
/// or negative baseline makes percentage delta meaningless).
pub fn check_route_deterioration(
    prev_score: f64,
    curr_score: f64,
    sensitivity_level: Option<u8>,
    base_pct: f64,
) -> Option<DetectedAlert> {
    if prev_score <= 0.0 {
        return None;
    }
    let effective_pct = base_pct * sensitivity_scale(sensitivity_level);
    let delta_pct = (curr_score - prev_score) / prev_score;
    if delta_pct >= effective_pct {
        Some(DetectedAlert {
            kind: AlertKind::RouteDeterioration,
            score_before: Some(prev_score),
            score_after: curr_score,
            threshold: effective_pct,
            metadata: json!({ "delta_pct": round4(delta_pct) }),
        })
    } else {
        None
    }
}

/// Fires when the maximum UPES sampled along the route reaches a critical
/// level, regardless of the mean.
pub fn check_hazard(max_upes_along_route: f64, critical_threshold: f64) -> Option<DetectedAlert> {
    if max_upes_along_route >= critical_threshold {
        Some(DetectedAlert {
            kind: AlertKind::Hazard,
            score_before: None,
            score_after: max_upes_along_route,
            threshold: critical_threshold,
            metadata: json!({}),
        })
    } else {
        None
    }
}

/// Fires when wind at the route midpoint is strong enough and blowing
/// (roughly) from a known pollution source toward the route. `wind_from_deg`
/// is the direction the wind comes *from*; pollution advects the opposite
/// way, so the check compares the source->midpoint bearing against
/// `wind_from_deg + 180`.
pub fn check_wind_shift(
    wind: WindObservation,
    route_mid: (f64, f64),
    source: (f64, f64),
    min_speed_kph: f64,
    max_angle_deg: f64,
) -> Option<DetectedAlert> {
    if wind.speed_kph < min_speed_kph {
        return None;
    }
    let (source_lon, source_lat) = (source.0, source.1);
    let (mid_lon, mid_lat) = (route_mid.0, route_mid.1);
    let bearing_to_route = bearing_deg(source_lon, source_lat, mid_lon, mid_lat);
    let wind_toward = (wind.from_deg + 180.0) % 360.0;
    let diff = angle_diff_deg(bearing_to_route, wind_toward);
    if diff <= max_angle_deg {
        Some(DetectedAlert {
            kind: AlertKind::WindShift,
            score_before: None,
            score_after: 0.0,
            threshold: max_angle_deg,
            metadata: json!({
                "wind_kph": wind.speed_kph,
                "wind_degree": wind.from_deg,
                "bearing_source_to_route": round4(bearing_to_route),
            }),
        })
    } else {
        None
    }
}

/// Fires when current exposure exceeds the best (lowest) score seen in the
/// recent window by at least `margin`.
pub fn check_time_based(
    current_upes: f64,
    recent_min_upes: f64,
    margin: f64,
) -> Option<DetectedAlert> {
    if current_upes >= recent_min_upes + margin {
        Some(DetectedAlert {
            kind: AlertKind::TimeBased,
            score_before: Some(recent_min_upes),
            score_after: current_upes,
            threshold: margin,
            metadata: json!({ "best_recent_score": recent_min_upes }),
        })
    } else {
        None
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Every input a detector run needs for one route/user pair. Wind and
/// source-point fields are `None` when unavailable, which simply skips the
/// detector that needs them (wind shift is otherwise not evaluated).
#[derive(Debug, Clone)]
pub struct DetectionInputs {
    pub current_upes: f64,
    pub max_upes: f64,
    pub prev_upes: Option<f64>,
    pub recent_min_upes: Option<f64>,
    pub sensitivity_level: Option<u8>,
    pub wind: Option<WindObservation>,
    pub route_mid: Option<(f64, f64)>,
    pub source: Option<(f64, f64)>,
}

/// Run all four detectors and collect whichever fired.
pub fn run_detection(inputs: &DetectionInputs) -> Vec<DetectedAlert> {
    let mut alerts = Vec::new();

    if let Some(prev) = inputs.prev_upes {
        if let Some(a) = check_route_deterioration(
            prev,
            inputs.current_upes,
            inputs.sensitivity_level,
            DEFAULT_DETERIORATION_BASE_PCT,
        ) {
            alerts.push(a);
        }
    }

    if let Some(a) = check_hazard(inputs.max_upes, DEFAULT_HAZARD_THRESHOLD) {
        alerts.push(a);
    }

    if let (Some(wind), Some(mid), Some(source)) = (inputs.wind, inputs.route_mid, inputs.source) {
        if let Some(a) = check_wind_shift(
            wind,
            mid,
            source,
            DEFAULT_WIND_SPEED_MIN_KPH,
            DEFAULT_WIND_ANGLE_MAX_DEG,
        ) {
            alerts.push(a);
        }
    }

    if let Some(recent_min) = inputs.recent_min_upes {
        if let Some(a) =
            check_time_based(inputs.current_upes, recent_min, DEFAULT_TIME_BASED_MARGIN)
        {
            alerts.push(a);
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterioration_fires_at_forty_percent_delta() {
        let a = check_route_deterioration(0.30, 0.42, Some(1), DEFAULT_DETERIORATION_BASE_PCT).unwrap();
        assert!((a.threshold - 0.15).abs() < 1e-9);
        assert_eq!(a.metadata["delta_pct"], json!(0.4));
    }

    #[test]
    fn deterioration_does_not_fire_below_threshold() {
        assert!(check_route_deterioration(0.30, 0.32, Some(1), DEFAULT_DETERIORATION_BASE_PCT).is_none());
    }

    #[test]
    fn deterioration_scales_stricter_for_sensitive_users() {
        // delta of 12% doesn't clear Normal's 15% base but clears Sensitive's 10.5%
        let prev = 0.40;
        let curr = prev * 1.12;
        assert!(check_route_deterioration(prev, curr, Some(1), DEFAULT_DETERIORATION_BASE_PCT).is_none());
        assert!(check_route_deterioration(prev, curr, Some(3), DEFAULT_DETERIORATION_BASE_PCT).is_some());
    }

    #[test]
    fn deterioration_ignores_nonpositive_baseline() {
        assert!(check_route_deterioration(0.0, 0.5, None, DEFAULT_DETERIORATION_BASE_PCT).is_none());
    }

    #[test]
    fn hazard_fires_at_threshold_not_below() {
        assert!(check_hazard(0.85, DEFAULT_HAZARD_THRESHOLD).is_some());
        assert!(check_hazard(0.84, DEFAULT_HAZARD_THRESHOLD).is_none());
    }

    #[test]
    fn wind_shift_fires_when_blowing_toward_route() {
        let wind = WindObservation { speed_kph: 10.0, from_deg: 180.0 };
        let source = (-118.0, 33.9);
        let mid = (-118.0, 34.0);
        let a = check_wind_shift(wind, mid, source, DEFAULT_WIND_SPEED_MIN_KPH, DEFAULT_WIND_ANGLE_MAX_DEG);
        assert!(a.is_some());
    }

    #[test]
    fn wind_shift_does_not_fire_when_blowing_away() {
        let wind = WindObservation { speed_kph: 10.0, from_deg: 90.0 };
        let source = (-118.0, 33.9);
        let mid = (-118.0, 34.0);
        let a = check_wind_shift(wind, mid, source, DEFAULT_WIND_SPEED_MIN_KPH, DEFAULT_WIND_ANGLE_MAX_DEG);
        assert!(a.is_none());
    }

    #[test]
    fn wind_shift_skipped_below_min_speed() {
        let wind = WindObservation { speed_kph: 2.0, from_deg: 180.0 };
        let a = check_wind_shift(wind, (-118.0, 34.0), (-118.0, 33.9), DEFAULT_WIND_SPEED_MIN_KPH, DEFAULT_WIND_ANGLE_MAX_DEG);
        assert!(a.is_none());
    }

    #[test]
    fn time_based_fires_above_margin_over_recent_minimum() {
        assert!(check_time_based(0.50, 0.30, DEFAULT_TIME_BASED_MARGIN).is_some());
        assert!(check_time_based(0.40, 0.30, DEFAULT_TIME_BASED_MARGIN).is_none());
    }

    #[test]
    fn run_detection_skips_wind_shift_without_source_point() {
        let inputs = DetectionInputs {
            current_upes: 0.9,
            max_upes: 0.9,
            prev_upes: None,
            recent_min_upes: None,
            sensitivity_level: None,
            wind: Some(WindObservation { speed_kph: 10.0, from_deg: 180.0 }),
            route_mid: Some((-118.0, 34.0)),
            source: None,
        };
        let alerts = run_detection(&inputs);
        assert!(alerts.iter().all(|a| a.kind != AlertKind::WindShift));
        assert!(alerts.iter().any(|a| a.kind == AlertKind::Hazard));
    }

    #[test]
    fn run_detection_collects_every_fired_detector() {
        let inputs = DetectionInputs {
            current_upes: 0.42,
            max_upes: 0.90,
            prev_upes: Some(0.30),
            recent_min_upes: Some(0.10),
            sensitivity_level: Some(1),
            wind: None,
            route_mid: None,
            source: None,
        };
        let alerts = run_detection(&inputs);
        let kinds: Vec<_> = alerts.iter().map(|a| a.kind).collect();
        assert!(kinds.contains(&AlertKind::RouteDeterioration));
        assert!(kinds.contains(&AlertKind::Hazard));
        assert!(kinds.contains(&AlertKind::TimeBased));
    }
}
