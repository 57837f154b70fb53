//! Orchestrates aggregation, normalization, and scoring into the two
//! output arrays (satellite score, final score) the raster writer emits.

use crate::aggregation::GasGrid;
use crate::core::{compute_final_score, compute_satellite_score, default_weights};
use crate::preprocessing::normalize_gas_with_percentile_bounds;
use aeris_common::{Gas, GridSpec};
use std::collections::HashMap;

/// Scalar modifiers evaluated once per hour at the bbox center.
#[derive(Debug, Clone, Copy)]
pub struct Modifiers {
    pub hdf: f64,
    pub wtf: f64,
    pub tf: f64,
}

impl Default for Modifiers {
    /// No weather/traffic data available: HDF/WTF/TF are all neutral.
    fn default() -> Self {
        Self {
            hdf: 1.0,
            wtf: 1.0,
            tf: 1.0,
        }
    }
}

/// The two output arrays plus the scalar log fields.
#[derive(Debug, Clone)]
pub struct UpesScores {
    pub spec: GridSpec,
    pub satellite_score: Vec<f32>,
    pub final_score: Vec<f32>,
    pub satellite_score_mean: f64,
    pub final_score_mean: f64,
}

/// Normalize each gas grid with its own 5th/95th percentile bounds, then
/// compute per-cell satellite score and final score (with optional EMA
/// smoothing against `previous_final`).
pub fn compute_upes_scores(
    gas_grids: &HashMap<Gas, GasGrid>,
    modifiers: Modifiers,
    previous_final: Option<&[f32]>,
    ema_lambda: Option<f64>,
) -> UpesScores {
    let spec = gas_grids
        .values()
        .next()
        .map(|g| g.spec)
        .expect("at least one gas grid is required");
    let weights = default_weights();
    let n = spec.len();

    let normalized: HashMap<Gas, Vec<f64>> = gas_grids
        .iter()
        .map(|(gas, grid)| {
            (
                *gas,
                normalize_gas_with_percentile_bounds(&grid.values, 5.0, 95.0),
            )
        })
        .collect();

    let mut satellite_score = vec![0.0f32; n];
    let mut final_score = vec![0.0f32; n];

    for i in 0..n {
        let mut cell_norms = HashMap::new();
        for (gas, values) in &normalized {
            let v = values[i];
            if !v.is_nan() {
                cell_norms.insert(*gas, v);
            }
        }
        let s = if cell_norms.is_empty() {
            0.0
        } else {
            compute_satellite_score(&cell_norms, &weights)
        };
        let prev = previous_final.map(|p| p[i] as f64);
        let f = compute_final_score(s, modifiers.hdf, modifiers.wtf, modifiers.tf, prev, ema_lambda);
        satellite_score[i] = s as f32;
        final_score[i] = f as f32;
    }

    let mean = |v: &[f32]| -> f64 {
        let valid: Vec<f64> = v.iter().map(|&x| x as f64).filter(|x| !x.is_nan()).collect();
        if valid.is_empty() {
            0.0
        } else {
            valid.iter().sum::<f64>() / valid.len() as f64
        }
    };

    UpesScores {
        satellite_score_mean: mean(&satellite_score),
        final_score_mean: mean(&final_score),
        spec,
        satellite_score,
        final_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeris_common::BoundingBox;

    fn flat_grid(spec: GridSpec, value: f64) -> GasGrid {
        GasGrid {
            values: vec![value; spec.len()],
            spec,
        }
    }

    #[test]
    fn uniform_input_gives_uniform_satellite_score() {
        let bbox = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
        let spec = GridSpec::from_bbox(bbox, 1.0);
        let grids: HashMap<Gas, GasGrid> = Gas::ALL
            .iter()
            .map(|g| (*g, flat_grid(spec, 1e16)))
            .collect();
        let scores = compute_upes_scores(&grids, Modifiers::default(), None, None);
        assert_eq!(scores.satellite_score.len(), spec.len());
        // uniform input -> degenerate percentile frame -> normalize to 0 -> score 0
        assert!(scores.satellite_score.iter().all(|&s| s == 0.0));
    }
}
