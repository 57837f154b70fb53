//! Bounding box type shared across ingestion, UPES, and routing.

use serde::{Deserialize, Serialize};

/// A WGS84 bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// The continental-US default ingestion bbox.
    pub fn conus() -> Self {
        Self::new(-125.0, 24.0, -66.0, 50.0)
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    pub fn is_valid(&self) -> bool {
        self.east > self.west && self.north > self.south
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.west < other.east
            && self.east > other.west
            && self.south < other.north
            && self.north > other.south
    }

    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conus_bbox_matches_defaults() {
        let bbox = BoundingBox::conus();
        assert_eq!(bbox.west, -125.0);
        assert_eq!(bbox.south, 24.0);
        assert_eq!(bbox.east, -66.0);
        assert_eq!(bbox.north, 50.0);
        assert!(bbox.is_valid());
    }

    #[test]
    fn invalid_when_degenerate() {
        let bbox = BoundingBox::new(0.0, 0.0, 0.0, 10.0);
        assert!(!bbox.is_valid());
    }
}
