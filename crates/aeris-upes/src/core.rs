//! UPES scoring: satellite score, meteorological modifiers, final score,
//! and EMA temporal smoothing.

use aeris_common::Gas;
use std::collections::HashMap;

/// `S(cell) = sum(w_g * norm_g(cell))` over the gases present in
/// `normalized`. Missing gases are skipped; their weight is not
/// redistributed among the remaining gases.
pub fn compute_satellite_score(normalized: &HashMap<Gas, f64>, weights: &HashMap<Gas, f64>) -> f64 {
    normalized
        .iter()
        .filter_map(|(gas, norm)| {
            let w = *weights.get(gas).unwrap_or(&0.0);
            if w <= 0.0 {
                None
            } else {
                Some(w * norm)
            }
        })
        .sum()
}

/// The default per-gas satellite-score weights, summing to 1.0.
pub fn default_weights() -> HashMap<Gas, f64> {
    Gas::ALL.iter().map(|g| (*g, g.upes_weight())).collect()
}

/// Humidity dispersion factor: `clip(1 - humidity% / 100, 0, 1)`.
pub fn humidity_dispersion_factor(humidity_pct: f64) -> f64 {
    (1.0 - humidity_pct / 100.0).clamp(0.0, 1.0)
}

/// Wind transport factor: `clip(min(speed/max_speed, 1) * cos(direction - target), 0, 1)`.
pub fn wind_factor(speed_kph: f64, direction_deg: f64, target_dir_deg: f64, max_speed_kph: f64) -> f64 {
    let speed_term = (speed_kph / max_speed_kph).min(1.0);
    let angle_term = (direction_deg - target_dir_deg).to_radians().cos();
    (speed_term * angle_term).clamp(0.0, 1.0)
}

/// Traffic factor: `1 + alpha * clip(density, 0, 1)`. With no traffic data
/// (density = 0) this is exactly 1.0.
pub fn traffic_factor(density: f64, alpha: f64) -> f64 {
    1.0 + alpha * density.clamp(0.0, 1.0)
}

/// Exponential moving average. Returns `current` unchanged if there is no
/// previous value, matching the original's "no smoothing on first run"
/// behavior.
pub fn apply_ema(current: f64, previous: Option<f64>, lambda: f64) -> f64 {
    match previous {
        Some(prev) => lambda * current + (1.0 - lambda) * prev,
        None => current,
    }
}

/// `raw = S * HDF * WTF * TF`, optionally EMA-smoothed against
/// `previous_final` when `ema_lambda` is in (0, 1].
pub fn compute_final_score(
    satellite_score: f64,
    hdf: f64,
    wtf: f64,
    tf: f64,
    previous_final: Option<f64>,
    ema_lambda: Option<f64>,
) -> f64 {
    let raw = satellite_score * hdf * wtf * tf;
    match ema_lambda {
        Some(lambda) if lambda > 0.0 && lambda <= 1.0 => apply_ema(raw, previous_final, lambda),
        _ => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satellite_score_matches_spec_scenario() {
        let normalized: HashMap<Gas, f64> = [
            (Gas::No2, 1.0),
            (Gas::Pm, 0.0),
            (Gas::O3, 0.5),
            (Gas::Ch2o, 1.0),
            (Gas::Ai, 0.0),
        ]
        .into_iter()
        .collect();
        let score = compute_satellite_score(&normalized, &default_weights());
        assert!((score - 0.50).abs() < 1e-9);
    }

    #[test]
    fn missing_gas_weight_is_not_redistributed() {
        let mut normalized: HashMap<Gas, f64> = default_weights().keys().map(|g| (*g, 1.0)).collect();
        normalized.remove(&Gas::Ai);
        let score = compute_satellite_score(&normalized, &default_weights());
        // sum of remaining weights (1.0 - 0.05), not renormalized to 1.0
        assert!((score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn ema_fixpoint_converges_to_constant_input() {
        let mut prev = Some(0.0);
        let mut value = 0.0;
        for _ in 0..200 {
            value = apply_ema(0.8, prev, 0.3);
            prev = Some(value);
        }
        assert!((value - 0.8).abs() < 1e-6);
    }

    #[test]
    fn ema_literal_scenario() {
        // current=[1.0,0.0], previous=[0.0,1.0], lambda=0.5 -> [0.5,0.5]
        assert_eq!(apply_ema(1.0, Some(0.0), 0.5), 0.5);
        assert_eq!(apply_ema(0.0, Some(1.0), 0.5), 0.5);
    }

    #[test]
    fn no_previous_value_means_no_smoothing() {
        assert_eq!(apply_ema(0.42, None, 0.6), 0.42);
    }

    #[test]
    fn humidity_dispersion_bounds() {
        assert_eq!(humidity_dispersion_factor(0.0), 1.0);
        assert_eq!(humidity_dispersion_factor(100.0), 0.0);
        assert_eq!(humidity_dispersion_factor(150.0), 0.0);
    }

    #[test]
    fn traffic_factor_with_no_data_is_one() {
        assert_eq!(traffic_factor(0.0, 0.1), 1.0);
    }

    #[test]
    fn final_score_bounded_by_satellite_times_tf_max() {
        let score = compute_final_score(0.8, 1.0, 1.0, 1.2, None, None);
        assert!(score <= 0.8 * 1.2 + 1e-9);
        assert!(score >= 0.0);
    }
}
