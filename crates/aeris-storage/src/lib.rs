//! Spatial store (PostGIS) and cache (Redis) adapters for AERIS.

pub mod cache;
pub mod store;

pub use cache::CacheAdapter;
pub use store::{GasObservation, LineAggregate, NewGridCell, SpatialStore, INSERT_CHUNK_SIZE};
