//! UPES (Unified Pollution Exposure Score) grid aggregation and scoring.

pub mod aggregation;
pub mod core;
pub mod preprocessing;
pub mod scoring;

pub use aggregation::{aggregate_pollution_grid_to_regular, GasGrid};
pub use scoring::{compute_upes_scores, Modifiers, UpesScores};
