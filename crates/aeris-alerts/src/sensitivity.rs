//! User sensitivity scaling for alert thresholds.

/// Scaling factor applied to a detector's base threshold: lower scale
/// means a stricter (easier-to-trigger) effective threshold. Unknown or
/// absent levels default to Normal (1.0).
pub fn sensitivity_scale(level: Option<u8>) -> f64 {
    match level {
        Some(1) | Some(2) => 1.0,
        Some(3) | Some(4) => 0.7,
        Some(5) => 0.5,
        _ => 1.0,
    }
}

/// Human-readable label for a sensitivity level, matching
/// [`sensitivity_scale`]'s bucketing.
pub fn sensitivity_label(level: Option<u8>) -> &'static str {
    match level {
        Some(1) | Some(2) => "Normal",
        Some(3) | Some(4) => "Sensitive",
        Some(5) => "Asthmatic",
        _ => "Normal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_band_scales_to_one() {
        assert_eq!(sensitivity_scale(Some(1)), 1.0);
        assert_eq!(sensitivity_scale(Some(2)), 1.0);
    }

    #[test]
    fn sensitive_band_scales_to_point_seven() {
        assert_eq!(sensitivity_scale(Some(3)), 0.7);
        assert_eq!(sensitivity_scale(Some(4)), 0.7);
    }

    #[test]
    fn asthmatic_band_scales_to_point_five() {
        assert_eq!(sensitivity_scale(Some(5)), 0.5);
    }

    #[test]
    fn absent_or_unknown_level_defaults_to_normal() {
        assert_eq!(sensitivity_scale(None), 1.0);
        assert_eq!(sensitivity_scale(Some(0)), 1.0);
        assert_eq!(sensitivity_scale(Some(9)), 1.0);
        assert_eq!(sensitivity_label(None), "Normal");
    }
}
