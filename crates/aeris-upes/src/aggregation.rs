//! Bucket raw pollution-grid observations into a regular per-gas grid.

use aeris_common::{BoundingBox, Gas, GridSpec};
use aeris_storage::SpatialStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::instrument;

/// A dense (ny, nx) array of mean pollution values, row-major, with NaN
/// for cells that had no observation.
#[derive(Debug, Clone)]
pub struct GasGrid {
    pub spec: GridSpec,
    /// len() == spec.len(); index via `row * nx + col`.
    pub values: Vec<f64>,
}

impl GasGrid {
    fn new_nan(spec: GridSpec) -> Self {
        Self {
            values: vec![f64::NAN; spec.len()],
            spec,
        }
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.spec.nx + col]
    }
}

/// Query the spatial store for centroids within `window`/`bbox`, bucket
/// each into `GridSpec::cell_index`, and return the mean value per gas per
/// cell. Cells with no observation remain NaN.
#[instrument(skip(store))]
pub async fn aggregate_pollution_grid_to_regular(
    store: &SpatialStore,
    window: (DateTime<Utc>, DateTime<Utc>),
    bbox: BoundingBox,
    resolution_deg: f64,
) -> aeris_common::AerisResult<HashMap<Gas, GasGrid>> {
    let spec = GridSpec::from_bbox(bbox, resolution_deg);
    let observations = store.range_query(window, bbox).await?;

    let mut sums: HashMap<Gas, Vec<f64>> = Gas::ALL.iter().map(|g| (*g, vec![0.0; spec.len()])).collect();
    let mut counts: HashMap<Gas, Vec<u32>> = Gas::ALL.iter().map(|g| (*g, vec![0u32; spec.len()])).collect();

    for obs in &observations {
        let (row, col) = spec.cell_index(obs.lon, obs.lat);
        let idx = row * spec.nx + col;
        sums.get_mut(&obs.gas).unwrap()[idx] += obs.value;
        counts.get_mut(&obs.gas).unwrap()[idx] += 1;
    }

    let mut grids = HashMap::new();
    for gas in Gas::ALL {
        let mut grid = GasGrid::new_nan(spec);
        let sum = &sums[&gas];
        let count = &counts[&gas];
        for i in 0..spec.len() {
            if count[i] > 0 {
                grid.values[i] = sum[i] / count[i] as f64;
            }
        }
        grids.insert(gas, grid);
    }
    Ok(grids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_grid_starts_all_nan() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let spec = GridSpec::from_bbox(bbox, 1.0);
        let grid = GasGrid::new_nan(spec);
        assert!(grid.values.iter().all(|v| v.is_nan()));
    }
}
