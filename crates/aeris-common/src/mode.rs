//! Travel mode and the fixed route-scoring weights per mode.

use serde::{Deserialize, Serialize};

/// A user's preferred activity, matching the `preferred_activity`
/// CHECK constraint (`commute`, `jog`, `cycle`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Commute,
    Jog,
    Cycle,
}

impl Mode {
    pub fn from_str_opt(s: &str) -> Option<Mode> {
        match s.to_ascii_lowercase().as_str() {
            "commute" | "commuter" => Some(Mode::Commute),
            "jog" | "jogger" => Some(Mode::Jog),
            "cycle" | "cyclist" => Some(Mode::Cycle),
            _ => None,
        }
    }

    /// (alpha, beta, gamma): weights on (mean exposure, distance_km, time_h)
    /// in the route edge cost function. Fixed per the routing spec, not
    /// operator-configurable.
    pub fn weights(&self) -> (f64, f64, f64) {
        match self {
            Mode::Commute => (0.2, 0.4, 0.4),
            Mode::Jog => (0.7, 0.15, 0.15),
            Mode::Cycle => (0.4, 0.3, 0.3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_mode_string_is_none() {
        assert_eq!(Mode::from_str_opt("bogus"), None);
    }

    #[test]
    fn weights_sum_to_one_per_mode() {
        for mode in [Mode::Commute, Mode::Jog, Mode::Cycle] {
            let (a, b, c) = mode.weights();
            assert!((a + b + c - 1.0).abs() < 1e-9);
        }
    }
}
