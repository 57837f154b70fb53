//! Regular lat/lon grid specification used by the UPES aggregator and the
//! raster writer/reader.

use crate::bbox::BoundingBox;
use serde::{Deserialize, Serialize};

/// A regular grid over a bounding box at a fixed degree resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridSpec {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    pub resolution_deg: f64,
    pub nx: usize,
    pub ny: usize,
}

impl GridSpec {
    /// Derive nx/ny from a bbox and resolution, always at least 1 cell
    /// in each direction.
    pub fn from_bbox(bbox: BoundingBox, resolution_deg: f64) -> Self {
        let nx = (((bbox.east - bbox.west) / resolution_deg) as usize).max(1);
        let ny = (((bbox.north - bbox.south) / resolution_deg) as usize).max(1);
        Self {
            west: bbox.west,
            south: bbox.south,
            east: bbox.east,
            north: bbox.north,
            resolution_deg,
            nx,
            ny,
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.west, self.south, self.east, self.north)
    }

    /// Map a (lon, lat) to a (row, col) grid index, clamped to the grid
    /// bounds. Row grows north-to-south is NOT assumed here: row = 0 is
    /// the southernmost band, matching `(lat - south) / res`.
    pub fn cell_index(&self, lon: f64, lat: f64) -> (usize, usize) {
        let col = ((lon - self.west) / self.resolution_deg) as isize;
        let row = ((lat - self.south) / self.resolution_deg) as isize;
        let col = col.clamp(0, self.nx as isize - 1) as usize;
        let row = row.clamp(0, self.ny as isize - 1) as usize;
        (row, col)
    }

    /// Geographic bounds of a single cell, as (west, south, east, north).
    pub fn cell_bounds(&self, row: usize, col: usize) -> (f64, f64, f64, f64) {
        let west = self.west + col as f64 * self.resolution_deg;
        let south = self.south + row as f64 * self.resolution_deg;
        (
            west,
            south,
            west + self.resolution_deg,
            south + self.resolution_deg,
        )
    }

    /// GDAL-style affine transform (c, a, b, f, d, e) for a north-up raster
    /// with row 0 at the north edge (standard raster convention).
    pub fn to_affine(&self) -> [f64; 6] {
        [
            self.west,
            self.resolution_deg,
            0.0,
            self.north,
            0.0,
            -self.resolution_deg,
        ]
    }

    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn is_empty(&self) -> bool {
        self.nx == 0 || self.ny == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bbox_computes_dims() {
        let bbox = BoundingBox::new(-125.0, 24.0, -66.0, 50.0);
        let spec = GridSpec::from_bbox(bbox, 1.0);
        assert_eq!(spec.nx, 59);
        assert_eq!(spec.ny, 26);
    }

    #[test]
    fn cell_index_clamps_to_bounds() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let spec = GridSpec::from_bbox(bbox, 1.0);
        assert_eq!(spec.cell_index(-5.0, -5.0), (0, 0));
        assert_eq!(spec.cell_index(100.0, 100.0), (9, 9));
        assert_eq!(spec.cell_index(5.5, 5.5), (5, 5));
    }
}
