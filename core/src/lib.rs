//! Core selection, filtering and aggregation for polar-orbiting sounder
//! scenes.
//!
//! Scenes are picked from a position cache by time and region, fetched into
//! an append-only local cache, filtered footprint by footprint, and reduced
//! into per-month radiance curves binned by latitude.

pub mod fetch;
pub mod geo;
pub mod granule;
pub mod index;
pub mod interface;
pub mod math;
pub mod pool;
pub mod prelude;
pub mod processing;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod fixtures;

pub use prelude::{CoreError, CoreResult, FootprintStage};
