//! Exit codes for CLI operations following Unix conventions.
//!
//! # Exit Code Semantics
//!
//! - `0`: Success - operation completed, something was recognized
//! - `1`: General error - unspecified failure
//! - `2`: Blocking error - saved state is inconsistent and automation should halt
//! - `3-125`: Specific recoverable errors
//! - `126-255`: Reserved by shell

use crate::cluster::ClusterError;
use crate::error::EngineError;
use crate::io::input::InputError;
use crate::layer::LayerError;

/// Standard exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Operation succeeded (code 0)
    Success = 0,

    /// Unspecified error occurred (code 1)
    GeneralError = 1,

    /// Critical error that should halt automation (code 2)
    BlockingError = 2,

    /// Command ran but recognized nothing (code 3)
    NotFound = 3,

    /// Input could not be parsed (code 4)
    ParseError = 4,

    /// File I/O error (code 5)
    IoError = 5,

    /// Configuration error (code 6)
    ConfigError = 6,

    /// Persisted cluster state is malformed (code 7)
    StateCorrupted = 7,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl ExitCode {
    /// `Success` if anything was recognized, `NotFound` otherwise.
    pub fn from_match_count(matches: usize) -> Self {
        if matches > 0 {
            ExitCode::Success
        } else {
            ExitCode::NotFound
        }
    }

    /// Convert an `EngineError` to the appropriate exit code.
    ///
    /// Maps specific error types to semantic exit codes that scripts
    /// can use to determine appropriate recovery actions.
    pub fn from_error(error: &EngineError) -> Self {
        if let Some(cluster) = error.cluster_error() {
            return match cluster {
                ClusterError::MalformedPersistedData { .. } => ExitCode::StateCorrupted,
                ClusterError::IoUnavailable { .. } => ExitCode::IoError,
                ClusterError::InvalidConfig { .. } => ExitCode::ConfigError,
                // Levels referencing each other inconsistently
                ClusterError::OutOfRange { .. }
                | ClusterError::DimensionMismatch { .. }
                | ClusterError::IdentitiesExhausted { .. } => ExitCode::BlockingError,
            };
        }

        match error {
            EngineError::Input(InputError::Read { .. }) => ExitCode::IoError,
            EngineError::Input(_) | EngineError::Layer(LayerError::ColumnLength { .. }) => {
                ExitCode::ParseError
            }
            EngineError::Config { .. }
            | EngineError::Spatial(_)
            | EngineError::Layer(LayerError::InvalidConfig { .. })
            | EngineError::Layer(LayerError::LevelOutOfRange { .. }) => ExitCode::ConfigError,
            _ => ExitCode::GeneralError,
        }
    }

    /// Check if this exit code indicates a blocking error.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, ExitCode::BlockingError)
    }

    /// Check if this exit code indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }

    /// Get a human-readable description of the exit code.
    pub fn description(&self) -> &str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::GeneralError => "General error",
            ExitCode::BlockingError => "Blocking error - automation should halt",
            ExitCode::NotFound => "Nothing recognized",
            ExitCode::ParseError => "Parse error",
            ExitCode::IoError => "I/O error",
            ExitCode::ConfigError => "Configuration error",
            ExitCode::StateCorrupted => "Cluster state corrupted",
        }
    }
}
