//! Layered scan-line classification.
//!
//! A scan runs over an image one column (tick) at a time. Each layer keeps a
//! decaying scalar per row; rows that fire are summarized into a feature
//! window and handed to the layer's own [`ClusterStore`](crate::cluster::ClusterStore)
//! for learning or recognition.
//!
//! - [`ImpulseLayer`] sits at the bottom and consumes raw on/off activations.
//! - [`ScanLineLayer`] consumes the cluster ids of the layer below and mixes
//!   in that layer's embedding for each id.
//! - [`LayerStack`] steps an impulse layer and any number of scan-line layers
//!   strictly bottom-up within each tick.

mod impulse;
mod scanline;
mod stack;

pub use impulse::{ImpulseLayer, ImpulseParams};
pub use scanline::ScanLineLayer;
pub use stack::{LayerStack, LevelStats, StackParams, level_file_name};

use thiserror::Error;

use crate::cluster::ClusterError;

/// Value a row's memory is set to when an event fires on it.
pub const MAX_ACTIVATION: f32 = 1.0;

/// Shape and learning parameters shared by every layer kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerParams {
    /// Rows per column.
    pub height: usize,
    /// Per-tick memory multiplier in `(0, 1]`.
    pub decay_rate: f32,
    /// Kernel half-width `k`; windows cover `2k + 1` rows.
    pub half_width: usize,
    /// Admission threshold of the layer's cluster store.
    pub distance_threshold: f32,
    /// Width of the embeddings this layer hands upward.
    pub embedding_dim: usize,
    /// Admit windows instead of classifying them.
    pub learning: bool,
}

impl LayerParams {
    /// Rows covered by one memory kernel.
    #[must_use]
    pub fn kernel_len(&self) -> usize {
        2 * self.half_width + 1
    }

    fn validate(&self) -> Result<(), LayerError> {
        if self.height == 0 {
            return Err(LayerError::InvalidConfig {
                reason: "layer height must be at least 1".to_string(),
            });
        }
        if !(self.decay_rate > 0.0 && self.decay_rate <= 1.0) {
            return Err(LayerError::InvalidConfig {
                reason: format!("decay rate must be in (0, 1], got {}", self.decay_rate),
            });
        }
        Ok(())
    }
}

/// Errors that can occur while stepping or configuring layers.
#[derive(Error, Debug)]
pub enum LayerError {
    #[error(
        "Column has {actual} rows, layer expects {expected}\nSuggestion: Every column of a scan must match the configured height"
    )]
    ColumnLength { expected: usize, actual: usize },

    #[error("Row {row} is outside a layer of height {height}")]
    RowOutOfRange { row: usize, height: usize },

    #[error("Level {level} does not exist, the stack has {levels} levels")]
    LevelOutOfRange { level: usize, levels: usize },

    #[error("Invalid layer configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Multiplies `value` by `rate`, guaranteeing strict decrease for `rate < 1`.
fn decay_value(value: f32, rate: f32) -> f32 {
    let next = value * rate;
    // Subnormals can round back up to themselves; snap them to zero
    if rate < 1.0 && next >= value {
        0.0
    } else {
        next
    }
}
