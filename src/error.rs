//! Error types for the pattern scanner
//!
//! Each subsystem owns a focused `thiserror` enum; [`EngineError`] gathers
//! them for callers that drive the whole pipeline and need stable codes
//! and recovery hints.

use thiserror::Error;

use crate::cluster::ClusterError;
use crate::io::input::InputError;
use crate::layer::LayerError;
use crate::spatial::SpatialError;

/// Top-level error for end-to-end operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error(transparent)]
    Spatial(#[from] SpatialError),

    #[error(transparent)]
    Input(#[from] InputError),

    /// Configuration errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl EngineError {
    /// The cluster error at the root of this error, if any.
    pub fn cluster_error(&self) -> Option<&ClusterError> {
        match self {
            Self::Cluster(e) | Self::Layer(LayerError::Cluster(e)) => Some(e),
            _ => None,
        }
    }

    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        if let Some(e) = self.cluster_error() {
            return match e {
                ClusterError::OutOfRange { .. } => "CLUSTER_OUT_OF_RANGE",
                ClusterError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
                ClusterError::InvalidConfig { .. } => "CONFIG_ERROR",
                ClusterError::MalformedPersistedData { .. } => "MALFORMED_STATE",
                ClusterError::IoUnavailable { .. } => "IO_UNAVAILABLE",
                ClusterError::IdentitiesExhausted { .. } => "IDENTITIES_EXHAUSTED",
            }
            .to_string();
        }

        match self {
            Self::Layer(LayerError::ColumnLength { .. }) => "COLUMN_LENGTH",
            Self::Layer(LayerError::RowOutOfRange { .. }) => "ROW_OUT_OF_RANGE",
            Self::Layer(LayerError::LevelOutOfRange { .. }) => "LEVEL_OUT_OF_RANGE",
            Self::Layer(LayerError::InvalidConfig { .. }) | Self::Config { .. } => "CONFIG_ERROR",
            Self::Spatial(SpatialError::InvalidCellSize(_)) => "INVALID_CELL_SIZE",
            Self::Input(InputError::Read { .. }) => "INPUT_READ_ERROR",
            Self::Input(_) => "INPUT_PARSE_ERROR",
            Self::Cluster(_) | Self::Layer(LayerError::Cluster(_)) => "GENERAL_ERROR",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        if let Some(e) = self.cluster_error() {
            return match e {
                ClusterError::MalformedPersistedData { .. } => vec![
                    "The state on disk was left untouched in memory; nothing was half-loaded",
                    "Retrain with 'patternscan train' to regenerate the cluster files",
                ],
                ClusterError::IoUnavailable { .. } => vec![
                    "Check that the state directory exists and is readable",
                    "Run 'patternscan train' first if no state has been saved yet",
                ],
                ClusterError::OutOfRange { .. } => vec![
                    "The levels of the saved state do not belong together",
                    "Retrain every level from level 0 upward",
                ],
                ClusterError::DimensionMismatch { .. } => vec![
                    "Kernel half-width or embedding_dim changed since the state was saved",
                    "Restore the previous settings or retrain",
                ],
                ClusterError::IdentitiesExhausted { .. } => vec![
                    "Raise clustering.distance_threshold so similar windows share a cluster",
                    "Retrain the level with 'patternscan train --fresh'",
                ],
                ClusterError::InvalidConfig { .. } => {
                    vec!["Check the [clustering] section of .patternscan/settings.toml"]
                }
            };
        }

        match self {
            Self::Layer(LayerError::ColumnLength { .. }) => vec![
                "Every raster must have exactly impulse.height rows",
                "Set PS_IMPULSE__HEIGHT or edit .patternscan/settings.toml to match the input",
            ],
            Self::Layer(LayerError::LevelOutOfRange { .. }) => vec![
                "Level 0 is the impulse layer; scan-line levels run from 1 to scanline.depth",
            ],
            Self::Layer(LayerError::InvalidConfig { .. })
            | Self::Config { .. }
            | Self::Spatial(_) => vec![
                "Run 'patternscan config' to see the effective settings",
                "Run 'patternscan init --force' to regenerate a default configuration",
            ],
            Self::Input(_) => vec![
                "Rasters are text grids: '.', '0' or space is off, anything else is on",
                "Point files hold one 'x y value' triple per line",
            ],
            _ => vec![],
        }
    }
}

/// Result type alias for end-to-end operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_cluster_error_codes() {
        let direct = EngineError::from(ClusterError::malformed(3, "bad token"));
        let nested = EngineError::from(LayerError::from(ClusterError::malformed(3, "bad token")));

        assert_eq!(direct.status_code(), "MALFORMED_STATE");
        assert_eq!(nested.status_code(), "MALFORMED_STATE");
        assert!(!nested.recovery_suggestions().is_empty());

        let exhausted = EngineError::from(ClusterError::IdentitiesExhausted { cluster_count: 7 });
        assert_eq!(exhausted.status_code(), "IDENTITIES_EXHAUSTED");
        assert!(exhausted.to_string().contains("7 clusters"));
    }

    #[test]
    fn test_layer_and_config_codes() {
        let column = EngineError::from(LayerError::ColumnLength {
            expected: 400,
            actual: 12,
        });
        assert_eq!(column.status_code(), "COLUMN_LENGTH");
        assert!(column.to_string().contains("400"));

        let config = EngineError::Config {
            reason: "depth".to_string(),
        };
        assert_eq!(config.status_code(), "CONFIG_ERROR");
        assert_eq!(
            EngineError::from(SpatialError::InvalidCellSize(0.0)).status_code(),
            "INVALID_CELL_SIZE"
        );
    }
}
