//! Point and line sampling of a UPES final-score raster, shared by the
//! route graph builder, the pathfinder's edge weighting, and the route
//! exposure sampler.

use crate::reader::{read_band1, Band};
use aeris_common::geo::resample_line;
use aeris_common::AerisResult;
use std::path::Path;

/// Samples outside [0, 1] are clamped; UPES values are defined in [0, 1]
/// but nodata/edge artifacts can occasionally escape that range.
fn clamp_sample(v: f32) -> f64 {
    (v as f64).clamp(0.0, 1.0)
}

pub(crate) fn sample_band_at(band: &Band, lon: f64, lat: f64) -> Option<f64> {
    let col = ((lon - band.transform.origin_x) / band.transform.pixel_width).floor();
    let row = ((band.transform.origin_y - lat) / band.transform.pixel_height).floor();
    if col < 0.0 || row < 0.0 {
        return None;
    }
    let (col, row) = (col as usize, row as usize);
    if col >= band.width || row >= band.height {
        return None;
    }
    let v = band.data[row * band.width + col];
    if v.is_nan() {
        None
    } else {
        Some(clamp_sample(v))
    }
}

/// Mean of valid samples along a resampled line, or `fallback` if the
/// raster is missing or no sample is valid.
pub fn sample_upes_along_line(
    raster_path: Option<&Path>,
    line_coords: &[(f64, f64)],
    step_m: f64,
    fallback: f64,
) -> AerisResult<f64> {
    let (mean, _max) = sample_upes_along_line_mean_max(raster_path, line_coords, step_m, fallback)?;
    Ok(mean)
}

/// `(mean, max)` of valid samples along a resampled line, or
/// `(fallback, fallback)` if the raster is missing or no sample is valid.
pub fn sample_upes_along_line_mean_max(
    raster_path: Option<&Path>,
    line_coords: &[(f64, f64)],
    step_m: f64,
    fallback: f64,
) -> AerisResult<(f64, f64)> {
    let Some(path) = raster_path else {
        return Ok((fallback, fallback));
    };
    let band = read_band1(path)?;
    let points = resample_line(line_coords, step_m);

    let samples: Vec<f64> = points
        .iter()
        .filter_map(|&(lon, lat)| sample_band_at(&band, lon, lat))
        .collect();

    if samples.is_empty() {
        return Ok((fallback, fallback));
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let max = samples.iter().cloned().fold(f64::MIN, f64::max);
    Ok((mean, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Affine;

    fn flat_band(value: f32) -> Band {
        Band {
            width: 4,
            height: 4,
            transform: Affine {
                origin_x: 0.0,
                pixel_width: 1.0,
                origin_y: 4.0,
                pixel_height: 1.0,
            },
            data: vec![value; 16],
        }
    }

    #[test]
    fn uniform_raster_mean_equals_value() {
        let band = flat_band(0.42);
        let s = sample_band_at(&band, 1.5, 1.5).unwrap();
        assert!((s - 0.42).abs() < 1e-6);
    }

    #[test]
    fn out_of_bounds_point_is_none() {
        let band = flat_band(0.5);
        assert!(sample_band_at(&band, 100.0, 100.0).is_none());
    }

    #[test]
    fn missing_raster_uses_fallback() {
        let result = sample_upes_along_line_mean_max(None, &[(0.0, 0.0), (1.0, 1.0)], 50.0, 0.5).unwrap();
        assert_eq!(result, (0.5, 0.5));
    }
}
