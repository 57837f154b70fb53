//! Edge speed inference and mode-dependent cost modifiers.

use crate::source::RawEdge;
use aeris_common::Mode;

const MPH_TO_KPH: f64 = 1.60934;

/// Infer speed in km/h from an edge's tags: explicit `maxspeed` (mph
/// converted when tagged), else by road class, else a flat default.
pub fn infer_speed_kph(edge: &RawEdge) -> f64 {
    if let Some(raw) = &edge.maxspeed {
        let upper = raw.trim().to_ascii_uppercase();
        let is_mph = upper.contains("MPH");
        let numeric = upper.replace("MPH", "").trim().to_string();
        if let Ok(v) = numeric.parse::<f64>() {
            return if is_mph { v * MPH_TO_KPH } else { v };
        }
    }
    match edge.highway.as_deref().unwrap_or("").to_ascii_lowercase().as_str() {
        "motorway" | "motorway_link" => 100.0,
        "trunk" | "trunk_link" => 80.0,
        "primary" | "primary_link" => 60.0,
        "secondary" | "secondary_link" => 50.0,
        "cycleway" | "path" => 15.0,
        "footway" | "pedestrian" => 5.0,
        _ => 25.0,
    }
}

/// Multiplier applied to the blended cost, clamped to [0.1, 5.0]. `> 1`
/// penalizes the edge for this mode, `< 1` rewards it.
pub fn mode_modifier(edge: &RawEdge, mode: Mode) -> f64 {
    let highway = edge.highway.as_deref().unwrap_or("").to_ascii_lowercase();
    let leisure = edge.leisure.as_deref().unwrap_or("").to_ascii_lowercase();
    let has_cycleway = edge.cycleway.is_some();
    let is_motor_trunk = matches!(
        highway.as_str(),
        "motorway" | "trunk" | "motorway_link" | "trunk_link"
    );
    let is_ped = matches!(highway.as_str(), "path" | "footway" | "pedestrian");

    let mut score = 1.0f64;
    match mode {
        Mode::Jog => {
            if is_motor_trunk {
                score *= 2.0;
            }
            if leisure == "park" || is_ped {
                score *= 0.5;
            }
        }
        Mode::Cycle => {
            if has_cycleway {
                score *= 0.7;
            }
            if is_motor_trunk {
                score *= 1.5;
            }
        }
        Mode::Commute => {
            if is_ped && edge.access.as_deref() != Some("yes") {
                score *= 1.2;
            }
        }
    }
    score.clamp(0.1, 5.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(highway: &str) -> RawEdge {
        RawEdge {
            highway: Some(highway.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn maxspeed_mph_converted_to_kph() {
        let e = RawEdge {
            maxspeed: Some("35 mph".to_string()),
            ..Default::default()
        };
        assert!((infer_speed_kph(&e) - 35.0 * MPH_TO_KPH).abs() < 1e-6);
    }

    #[test]
    fn maxspeed_plain_number_is_kph() {
        let e = RawEdge {
            maxspeed: Some("90".to_string()),
            ..Default::default()
        };
        assert_eq!(infer_speed_kph(&e), 90.0);
    }

    #[test]
    fn highway_class_defaults() {
        assert_eq!(infer_speed_kph(&edge("motorway")), 100.0);
        assert_eq!(infer_speed_kph(&edge("footway")), 5.0);
        assert_eq!(infer_speed_kph(&edge("residential")), 25.0);
    }

    #[test]
    fn jogger_penalizes_motorway_rewards_park() {
        let motorway = edge("motorway");
        assert_eq!(mode_modifier(&motorway, Mode::Jog), 2.0);
        let footway = edge("footway");
        assert_eq!(mode_modifier(&footway, Mode::Jog), 0.5);
    }

    #[test]
    fn cyclist_rewards_cycleway_tag_penalizes_motorway() {
        let mut cycleway_edge = edge("residential");
        cycleway_edge.cycleway = Some("track".to_string());
        assert_eq!(mode_modifier(&cycleway_edge, Mode::Cycle), 0.7);
        assert_eq!(mode_modifier(&edge("trunk"), Mode::Cycle), 1.5);
    }

    #[test]
    fn commute_penalizes_footway_without_access() {
        let footway = edge("footway");
        assert_eq!(mode_modifier(&footway, Mode::Commute), 1.2);
        let mut with_access = footway.clone();
        with_access.access = Some("yes".to_string());
        assert_eq!(mode_modifier(&with_access, Mode::Commute), 1.0);
    }

    #[test]
    fn modifier_always_clamped() {
        // combine penalties beyond 5.0 to exercise the clamp
        let mut e = edge("motorway");
        e.leisure = None;
        let m = mode_modifier(&e, Mode::Jog);
        assert!((0.1..=5.0).contains(&m));
    }
}
