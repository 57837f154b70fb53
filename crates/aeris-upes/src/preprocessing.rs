//! Percentile-based normalization of raw pollutant arrays into [0, 1].

use chrono::{DateTime, Timelike, Utc};

/// Truncate a timestamp to the start of its UTC hour.
pub fn hour_slot_utc(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Clip `(v - min) / (max - min)` to [0, 1]. Returns 0.0 for a degenerate
/// frame (`max <= min`) rather than dividing by zero. NaN inputs pass
/// through as NaN (caller filters NaN cells before scoring).
pub fn normalize_gas(value: f64, min_val: f64, max_val: f64) -> f64 {
    if value.is_nan() {
        return f64::NAN;
    }
    if max_val <= min_val {
        return 0.0;
    }
    ((value - min_val) / (max_val - min_val)).clamp(0.0, 1.0)
}

/// 5th/95th percentile bounds over the valid (non-NaN) values in `values`.
/// Returns `(0.0, 1.0)` when there is no valid data, and bumps `max` by 1.0
/// when the computed bounds would otherwise be degenerate.
pub fn percentile_bounds(values: &[f64], low: f64, high: f64) -> (f64, f64) {
    let mut valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if valid.is_empty() {
        return (0.0, 1.0);
    }
    valid.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let pick = |pct: f64| -> f64 {
        let idx = ((pct / 100.0) * (valid.len() as f64 - 1.0)).round() as usize;
        valid[idx.min(valid.len() - 1)]
    };

    let mut min_g = pick(low);
    let mut max_g = pick(high);
    if max_g <= min_g {
        max_g = min_g + 1.0;
    }
    // keep names symmetric with the non-degenerate path
    if min_g > max_g {
        std::mem::swap(&mut min_g, &mut max_g);
    }
    (min_g, max_g)
}

/// Normalize every value in `values` using percentile bounds computed over
/// the same slice (the default path when explicit bounds aren't given).
pub fn normalize_gas_with_percentile_bounds(values: &[f64], low: f64, high: f64) -> Vec<f64> {
    let (min_g, max_g) = percentile_bounds(values, low, high);
    values
        .iter()
        .map(|&v| normalize_gas(v, min_g, max_g))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn hour_slot_truncates() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 14, 37, 52).unwrap();
        let slot = hour_slot_utc(ts);
        assert_eq!(slot.minute(), 0);
        assert_eq!(slot.second(), 0);
        assert_eq!(slot.hour(), 14);
    }

    #[test]
    fn normalize_is_idempotent_after_01_clamp() {
        let first = normalize_gas(0.75, 0.0, 1.0);
        let second = normalize_gas(first, 0.0, 1.0);
        assert_eq!(first, second);
    }

    #[test]
    fn normalize_degenerate_frame_is_zero() {
        assert_eq!(normalize_gas(5.0, 3.0, 3.0), 0.0);
    }

    #[test]
    fn percentile_bounds_empty_is_zero_one() {
        assert_eq!(percentile_bounds(&[], 5.0, 95.0), (0.0, 1.0));
    }

    #[test]
    fn percentile_bounds_ignores_nan() {
        let values = vec![1.0, 2.0, f64::NAN, 3.0, 4.0, 5.0];
        let (min_g, max_g) = percentile_bounds(&values, 5.0, 95.0);
        assert!(min_g < max_g);
        assert!(min_g >= 1.0 && max_g <= 5.0);
    }
}
