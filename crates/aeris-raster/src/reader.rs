//! Single-band GeoTIFF reading.

use aeris_common::{AerisError, AerisResult};
use std::fs::File;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

/// GeoTIFF tag numbers not exposed as named constants by the `tiff` crate.
const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;

/// An affine georeferencing transform: `(origin_x, pixel_width, 0, origin_y, 0, -pixel_height)`,
/// matching the conventional GDAL/rasterio affine-transform layout.
#[derive(Debug, Clone, Copy)]
pub struct Affine {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub origin_y: f64,
    pub pixel_height: f64,
}

impl Affine {
    /// Half-cell offsets used to derive a cell's polygon bounds from its
    /// center. Falls back to 0.025 degrees when the transform carries no
    /// usable scale (matches the original normalizer's guard for
    /// zero/garbage pixel scale).
    pub fn half_cell(&self) -> (f64, f64) {
        let hw = if self.pixel_width.abs() > 0.0 {
            self.pixel_width.abs() / 2.0
        } else {
            0.025
        };
        let hh = if self.pixel_height.abs() > 0.0 {
            self.pixel_height.abs() / 2.0
        } else {
            0.025
        };
        (hw, hh)
    }

    /// Center coordinate of pixel (row, col), row 0 at the north edge.
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        let lon = self.origin_x + (col as f64 + 0.5) * self.pixel_width;
        let lat = self.origin_y - (row as f64 + 0.5) * self.pixel_height;
        (lon, lat)
    }
}

/// A decoded single-band raster: row-major f32 samples plus its
/// georeferencing transform.
pub struct Band {
    pub width: usize,
    pub height: usize,
    pub transform: Affine,
    pub data: Vec<f32>,
}

/// Read band 1 of a single-band GeoTIFF.
pub fn read_band1(path: &Path) -> AerisResult<Band> {
    let file = File::open(path)
        .map_err(|e| AerisError::SchemaAnomaly(format!("cannot open {}: {}", path.display(), e)))?;
    let mut decoder = Decoder::new(file)
        .map_err(|e| AerisError::SchemaAnomaly(format!("tiff decode failed: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| AerisError::SchemaAnomaly(format!("tiff dimensions failed: {}", e)))?;

    let pixel_scale = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE_TAG))
        .unwrap_or_else(|_| vec![1.0, 1.0, 0.0]);
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT_TAG))
        .unwrap_or_else(|_| vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

    let transform = Affine {
        pixel_width: pixel_scale.first().copied().unwrap_or(1.0),
        pixel_height: pixel_scale.get(1).copied().unwrap_or(1.0),
        origin_x: tiepoint.get(3).copied().unwrap_or(0.0),
        origin_y: tiepoint.get(4).copied().unwrap_or(0.0),
    };

    let result = decoder
        .read_image()
        .map_err(|e| AerisError::SchemaAnomaly(format!("tiff read failed: {}", e)))?;

    let data: Vec<f32> = match result {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U16(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U8(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        other => {
            return Err(AerisError::SchemaAnomaly(format!(
                "unsupported sample format: {:?}",
                std::mem::discriminant(&other)
            )))
        }
    };

    Ok(Band {
        width: width as usize,
        height: height as usize,
        transform,
        data,
    })
}
