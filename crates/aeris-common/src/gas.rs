//! Gas tags and pollution severity classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five gases TEMPO-style satellite coverage ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gas {
    /// Tropospheric NO2 column density, molecules/cm^2.
    No2,
    /// Formaldehyde column density, molecules/cm^2.
    Ch2o,
    /// Aerosol index, dimensionless.
    Ai,
    /// Aerosol optical depth (PM proxy), dimensionless.
    Pm,
    /// Total-column ozone, Dobson Units.
    O3,
}

impl Gas {
    pub const ALL: [Gas; 5] = [Gas::No2, Gas::Ch2o, Gas::Ai, Gas::Pm, Gas::O3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gas::No2 => "NO2",
            Gas::Ch2o => "CH2O",
            Gas::Ai => "AI",
            Gas::Pm => "PM",
            Gas::O3 => "O3",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Gas> {
        match s.to_ascii_uppercase().as_str() {
            "NO2" => Some(Gas::No2),
            "CH2O" => Some(Gas::Ch2o),
            "AI" => Some(Gas::Ai),
            "PM" => Some(Gas::Pm),
            "O3" => Some(Gas::O3),
            _ => None,
        }
    }

    /// Fill-sentinel magnitude ceiling: pixels whose absolute value exceeds
    /// this are satellite fill values, not real observations.
    pub fn fill_ceiling(&self) -> f64 {
        match self {
            Gas::No2 | Gas::Ch2o => 1e18,
            Gas::Ai | Gas::Pm | Gas::O3 => 1e10,
        }
    }

    /// Severity thresholds (moderate, unhealthy, very_unhealthy, hazardous).
    fn thresholds(&self) -> [f64; 4] {
        match self {
            Gas::No2 => [5e15, 1e16, 2e16, 3e16],
            Gas::Ch2o => [8e15, 1.6e16, 3.2e16, 6.4e16],
            Gas::Ai => [1.0, 2.0, 4.0, 7.0],
            Gas::Pm => [0.2, 0.5, 1.0, 2.0],
            Gas::O3 => [220.0, 280.0, 400.0, 500.0],
        }
    }

    /// Default UPES satellite-score weight for this gas.
    pub fn upes_weight(&self) -> f64 {
        match self {
            Gas::No2 => 0.30,
            Gas::Pm => 0.35,
            Gas::O3 => 0.20,
            Gas::Ch2o => 0.10,
            Gas::Ai => 0.05,
        }
    }
}

impl fmt::Display for Gas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity level in [0, 4], a pure function of (value, gas).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Severity(pub u8);

impl Severity {
    pub fn label(&self) -> &'static str {
        match self.0 {
            0 => "good",
            1 => "moderate",
            2 => "unhealthy",
            3 => "very_unhealthy",
            4 => "hazardous",
            _ => "unknown",
        }
    }
}

/// Classify a pollutant value into a severity level for the given gas.
///
/// Returns `None` for NaN values (no-data), so the caller can treat a
/// no-data pixel as "not observed" rather than "good".
pub fn classify(value: f64, gas: Gas) -> Option<Severity> {
    if value.is_nan() {
        return None;
    }
    let [moderate, unhealthy, very_unhealthy, hazardous] = gas.thresholds();
    let level = if value >= hazardous {
        4
    } else if value >= very_unhealthy {
        3
    } else if value >= unhealthy {
        2
    } else if value >= moderate {
        1
    } else {
        0
    };
    Some(Severity(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_no2_boundaries() {
        assert_eq!(classify(2e16, Gas::No2).unwrap().0, 3);
        assert_eq!(classify(5e15, Gas::No2).unwrap().0, 1);
        assert_eq!(classify(0.0, Gas::No2).unwrap().0, 0);
    }

    #[test]
    fn classify_nan_is_none() {
        assert!(classify(f64::NAN, Gas::Pm).is_none());
    }

    #[test]
    fn fill_ceiling_by_gas_family() {
        assert_eq!(Gas::No2.fill_ceiling(), 1e18);
        assert_eq!(Gas::Ch2o.fill_ceiling(), 1e18);
        assert_eq!(Gas::Ai.fill_ceiling(), 1e10);
        assert_eq!(Gas::Pm.fill_ceiling(), 1e10);
        assert_eq!(Gas::O3.fill_ceiling(), 1e10);
    }

    #[test]
    fn upes_weights_sum_to_one() {
        let sum: f64 = Gas::ALL.iter().map(|g| g.upes_weight()).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn gas_round_trips_through_str() {
        for gas in Gas::ALL {
            assert_eq!(Gas::from_str_opt(gas.as_str()), Some(gas));
        }
        assert_eq!(Gas::from_str_opt("no2"), Some(Gas::No2));
        assert_eq!(Gas::from_str_opt("bogus"), None);
    }
}
