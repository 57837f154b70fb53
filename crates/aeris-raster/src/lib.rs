//! GeoTIFF raster normalization and UPES raster output for AERIS.

pub mod normalizer;
pub mod reader;
pub mod sampler;
pub mod writer;

pub use normalizer::{geotiff_to_grid_cells, NormalizedCell, DEFAULT_MAX_CELLS};
pub use reader::{read_band1, Affine, Band};
pub use sampler::{sample_upes_along_line, sample_upes_along_line_mean_max};
pub use writer::{
    ensure_output_dirs, flip_rows, latest_final_score_path, write_upes_log, write_upes_rasters,
    UpesLogRecord,
};
