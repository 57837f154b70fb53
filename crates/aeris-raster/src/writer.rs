//! UPES raster output (component F): writes the satellite-score and
//! final-score arrays as single-band GeoTIFFs plus a companion JSON log,
//! and resolves the "latest final-score raster" by modification time.

use aeris_common::grid::GridSpec;
use aeris_common::{AerisError, AerisResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tiff::encoder::{colortype, TiffEncoder};

/// Companion JSON log record for one hour's UPES compute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpesLogRecord {
    pub timestamp: DateTime<Utc>,
    pub granule_ids: Vec<String>,
    pub hdf: f64,
    pub wtf: f64,
    pub tf: f64,
    pub satellite_score_mean: f64,
    pub final_score_mean: f64,
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

impl UpesLogRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        granule_ids: Vec<String>,
        hdf: f64,
        wtf: f64,
        tf: f64,
        satellite_score_mean: f64,
        final_score_mean: f64,
    ) -> Self {
        Self {
            timestamp,
            granule_ids,
            hdf: round4(hdf),
            wtf: round4(wtf),
            tf: round4(tf),
            satellite_score_mean: round4(satellite_score_mean),
            final_score_mean: round4(final_score_mean),
        }
    }
}

/// Create the output directory layout the worker writes rasters and logs
/// under: `raw/`, `normalized/`, `hourly_scores/{satellite_score,final_score}/`, `logs/`.
pub fn ensure_output_dirs(base: &Path) -> AerisResult<()> {
    for sub in [
        "raw",
        "normalized",
        "hourly_scores/satellite_score",
        "hourly_scores/final_score",
        "logs",
    ] {
        std::fs::create_dir_all(base.join(sub))?;
    }
    Ok(())
}

/// Flip a row-major `(ny, nx)` array across its horizontal axis: row `r`
/// of the input becomes row `ny - 1 - r` of the output. Its own inverse,
/// so the same function converts south-up <-> north-up in either
/// direction.
pub fn flip_rows(data: &[f32], nx: usize, ny: usize) -> Vec<f32> {
    let mut flipped = vec![0f32; data.len()];
    for row in 0..ny {
        let src = &data[row * nx..(row + 1) * nx];
        let dst_row = ny - 1 - row;
        flipped[dst_row * nx..(dst_row + 1) * nx].copy_from_slice(src);
    }
    flipped
}

/// Write a single-band float32 GeoTIFF.
///
/// `data` is in the grid's own south-up convention (row 0 = southernmost
/// band, matching `GridSpec::cell_index`), but the GeoTIFF tags declare a
/// north-up raster with row 0 at the north edge (`to_affine`). Rows are
/// flipped here so the bytes on disk actually match that declared layout;
/// `read_band1` + this flip's inverse must be applied by any reader that
/// wants the data back in grid (south-up) row order.
pub fn write_geotiff(path: &Path, data: &[f32], spec: &GridSpec) -> AerisResult<()> {
    let file = File::create(path)
        .map_err(|e| AerisError::Fatal(format!("cannot create {}: {}", path.display(), e)))?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))
        .map_err(|e| AerisError::Fatal(format!("tiff encoder init failed: {}", e)))?;

    let mut image = encoder
        .new_image::<colortype::Gray32Float>(spec.nx as u32, spec.ny as u32)
        .map_err(|e| AerisError::Fatal(format!("tiff image init failed: {}", e)))?;

    let affine = spec.to_affine();
    image
        .encoder()
        .write_tag(tiff::tags::Tag::Unknown(33550), &[affine[1], affine[1], 0.0][..])
        .map_err(|e| AerisError::Fatal(format!("tiff geo tag failed: {}", e)))?;
    image
        .encoder()
        .write_tag(
            tiff::tags::Tag::Unknown(33922),
            &[0.0, 0.0, 0.0, affine[0], affine[3], 0.0][..],
        )
        .map_err(|e| AerisError::Fatal(format!("tiff geo tag failed: {}", e)))?;

    let north_up = flip_rows(data, spec.nx, spec.ny);
    image
        .write_data(&north_up)
        .map_err(|e| AerisError::Fatal(format!("tiff write failed: {}", e)))?;
    Ok(())
}

/// Write both UPES rasters for this hour, returning their paths.
pub fn write_upes_rasters(
    base: &Path,
    timestamp: DateTime<Utc>,
    satellite_score: &[f32],
    final_score: &[f32],
    spec: &GridSpec,
) -> AerisResult<(PathBuf, PathBuf)> {
    let stamp = timestamp.format("%Y%m%d_%H").to_string();
    let satellite_path = base
        .join("hourly_scores/satellite_score")
        .join(format!("satellite_score_{}.tif", stamp));
    let final_path = base
        .join("hourly_scores/final_score")
        .join(format!("final_score_{}.tif", stamp));

    write_geotiff(&satellite_path, satellite_score, spec)?;
    write_geotiff(&final_path, final_score, spec)?;
    Ok((satellite_path, final_path))
}

pub fn write_upes_log(base: &Path, timestamp: DateTime<Utc>, record: &UpesLogRecord) -> AerisResult<PathBuf> {
    let stamp = timestamp.format("%Y%m%d_%H").to_string();
    let path = base.join("logs").join(format!("upes_{}.json", stamp));
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Most recently modified `final_score_*.tif` under `base`, or `None` if
/// no UPES raster has ever been written.
pub fn latest_final_score_path(base: &Path) -> Option<PathBuf> {
    let dir = base.join("hourly_scores/final_score");
    walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file()
                && e.file_name().to_string_lossy().starts_with("final_score_")
        })
        .filter_map(|e| {
            let modified = e.metadata().ok()?.modified().ok()?;
            Some((modified, e.path().to_path_buf()))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeris_common::BoundingBox;
    use tempfile::tempdir;

    #[test]
    fn ensure_output_dirs_creates_full_layout() {
        let dir = tempdir().unwrap();
        ensure_output_dirs(dir.path()).unwrap();
        assert!(dir.path().join("hourly_scores/final_score").is_dir());
        assert!(dir.path().join("logs").is_dir());
    }

    #[test]
    fn log_record_rounds_to_four_decimals() {
        let record = UpesLogRecord::new(Utc::now(), vec!["G1".into()], 0.123456, 1.0, 1.0, 0.5, 0.5);
        assert_eq!(record.hdf, 0.1235);
    }

    #[test]
    fn latest_final_score_path_none_when_empty() {
        let dir = tempdir().unwrap();
        ensure_output_dirs(dir.path()).unwrap();
        assert!(latest_final_score_path(dir.path()).is_none());
    }

    #[test]
    fn write_and_find_latest_raster() {
        let dir = tempdir().unwrap();
        ensure_output_dirs(dir.path()).unwrap();
        let bbox = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
        let spec = GridSpec::from_bbox(bbox, 1.0);
        let data = vec![0.5f32; spec.len()];
        let ts = Utc::now();
        let (_, final_path) = write_upes_rasters(dir.path(), ts, &data, &data, &spec).unwrap();
        let latest = latest_final_score_path(dir.path()).unwrap();
        assert_eq!(latest, final_path);
    }

    #[test]
    fn flip_rows_is_its_own_inverse() {
        let data: Vec<f32> = vec![0.9, 0.9, 0.1, 0.1];
        let flipped = flip_rows(&data, 2, 2);
        assert_eq!(flipped, vec![0.1, 0.1, 0.9, 0.9]);
        assert_eq!(flip_rows(&flipped, 2, 2), data);
    }

    /// South row = 0.9, north row = 0.1 in the grid's own south-up
    /// convention (row 0 = southernmost band). A north-up reader must see
    /// the north row (0.1), not the mirrored south value.
    #[test]
    fn write_then_sample_preserves_north_south_orientation() {
        let dir = tempdir().unwrap();
        let bbox = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
        let spec = GridSpec::from_bbox(bbox, 1.0);
        let south_up = vec![0.9f32, 0.9, 0.1, 0.1];
        let path = dir.path().join("nonuniform.tif");
        write_geotiff(&path, &south_up, &spec).unwrap();

        let band = crate::reader::read_band1(&path).unwrap();
        let north_point = crate::sampler::sample_band_at(&band, 0.5, 1.5).unwrap();
        let south_point = crate::sampler::sample_band_at(&band, 0.5, 0.5).unwrap();
        assert!((north_point - 0.1).abs() < 1e-6, "north sample was {north_point}");
        assert!((south_point - 0.9).abs() < 1e-6, "south sample was {south_point}");
    }
}
