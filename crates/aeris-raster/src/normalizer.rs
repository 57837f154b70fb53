//! Raster normalizer (component B): GeoTIFF -> stream of grid cells with
//! severity, subsampled so a raster never emits more than a configured
//! number of cells.

use crate::reader::{read_band1, Affine};
use aeris_common::gas::classify;
use aeris_common::{AerisResult, Gas};
use chrono::{DateTime, Utc};
use std::path::Path;

/// A normalized cell ready for bulk insertion into the spatial store.
#[derive(Debug, Clone)]
pub struct NormalizedCell {
    pub timestamp: DateTime<Utc>,
    pub gas: Gas,
    pub polygon_wkt: String,
    pub pollution_value: f64,
    pub severity_level: u8,
}

/// Default subsampling cap: a raster is never allowed to emit more than
/// this many cells, regardless of its native resolution.
pub const DEFAULT_MAX_CELLS: usize = 5000;

fn cell_to_wkt(center_lon: f64, center_lat: f64, half_w: f64, half_h: f64) -> String {
    let (w, e) = (center_lon - half_w, center_lon + half_w);
    let (s, n) = (center_lat - half_h, center_lat + half_h);
    format!(
        "POLYGON(({w} {s}, {e} {s}, {e} {n}, {w} {n}, {w} {s}))",
        w = w,
        e = e,
        s = s,
        n = n
    )
}

/// Read band 1 of `path`, skip NaN pixels and per-gas fill sentinels,
/// subsample so that at most `max_cells` cells are emitted, and classify
/// each surviving pixel into a severity level.
///
/// `max_cells` of `None` uses [`DEFAULT_MAX_CELLS`].
pub fn geotiff_to_grid_cells(
    path: &Path,
    gas: Gas,
    timestamp: DateTime<Utc>,
    max_cells: Option<usize>,
) -> AerisResult<Vec<NormalizedCell>> {
    let band = read_band1(path)?;
    let max_cells = max_cells.unwrap_or(DEFAULT_MAX_CELLS);
    let total_pixels = band.width * band.height;
    let step = if total_pixels > max_cells {
        ((total_pixels as f64 / max_cells as f64).sqrt().ceil() as usize).max(1)
    } else {
        1
    };

    let (half_w, half_h) = band.transform.half_cell();
    let fill_ceiling = gas.fill_ceiling();

    let mut cells = Vec::new();
    let mut row = 0;
    while row < band.height {
        let mut col = 0;
        while col < band.width {
            let value = band.data[row * band.width + col] as f64;
            if !value.is_nan() && value.abs() <= fill_ceiling {
                if let Some(severity) = classify(value, gas) {
                    let (lon, lat) = band.transform.pixel_center(row, col);
                    cells.push(NormalizedCell {
                        timestamp,
                        gas,
                        polygon_wkt: cell_to_wkt(lon, lat, half_w, half_h),
                        pollution_value: value,
                        severity_level: severity.0,
                    });
                }
            }
            col += step;
        }
        row += step;
    }
    Ok(cells)
}

/// Half-cell accessor re-exported for callers that need the raw transform.
pub fn transform_half_cell(transform: &Affine) -> (f64, f64) {
    transform.half_cell()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wkt_cell_has_five_coords_and_is_closed() {
        let wkt = cell_to_wkt(-117.5, 34.5, 0.05, 0.05);
        let coords = wkt
            .trim_start_matches("POLYGON((")
            .trim_end_matches("))")
            .split(',')
            .count();
        assert_eq!(coords, 5);
        assert!(wkt.starts_with("POLYGON((-117.55 34.45"));
    }

    #[test]
    fn subsample_step_caps_emitted_cells() {
        // 100x100 raster (10000 pixels) against a 5000-cell cap -> stride 2
        let total_pixels = 100 * 100;
        let max_cells = 5000;
        let step = ((total_pixels as f64 / max_cells as f64).sqrt().ceil() as usize).max(1);
        assert_eq!(step, 2);
        let emitted = (100 / step) * (100 / step);
        assert!(emitted <= max_cells);
    }
}
