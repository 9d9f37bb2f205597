//! Spatial lookups over sparse 2D point streams.
//!
//! A [`SpatialIndex`] buckets weighted points into a uniform grid and answers
//! radius queries with Gaussian weights, which makes it usable directly as a
//! denoising aggregate over impulse or edge samples.

mod grid;

pub use grid::{CellKey, Neighbor, Point2, SpatialIndex, WeightedPoint, gaussian_weight};

use thiserror::Error;

/// Errors specific to spatial index construction.
#[derive(Error, Debug)]
pub enum SpatialError {
    #[error(
        "Invalid cell size: {0}\nSuggestion: Use a finite cell size greater than zero, close to the typical query radius"
    )]
    InvalidCellSize(f32),
}
