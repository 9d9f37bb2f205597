//! Type-safe wrappers and core types for the cluster store.
//!
//! Cluster identities and feature dimensions get their own newtypes so a row
//! index, a member count and a cluster identity can never be confused with
//! each other at a call site.

use std::path::PathBuf;
use thiserror::Error;

/// Width of the centroid written per record when nothing else is configured.
///
/// This is the width of a bottom-layer impulse window (`2 * 2 + 1`).
pub const DEFAULT_FEATURE_WIDTH: usize = 5;

/// Width of the discrete embedding handed to the layer above.
pub const DEFAULT_EMBEDDING_DIM: usize = 5;

/// Type-safe wrapper for cluster identities.
///
/// Identities are assigned in creation order starting at zero and are never
/// reused. The embedding identity persisted next to a cluster is always the
/// same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(u32);

impl ClusterId {
    /// Creates a new `ClusterId`.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying u32 value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns the identity that follows this one, or `None` once the
    /// identity space is used up.
    #[must_use]
    pub const fn checked_next(&self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(next) => Some(Self(next)),
            None => None,
        }
    }
}

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for ClusterId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

/// Type-safe wrapper for feature vector dimensions.
///
/// Ensures runtime validation of vector widths so a window built for one
/// layer is never compared against the centroids of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureDimension(usize);

impl FeatureDimension {
    /// Creates a new `FeatureDimension` with validation.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> Result<Self, ClusterError> {
        if dim == 0 {
            return Err(ClusterError::InvalidConfig {
                reason: "feature dimension cannot be zero".to_string(),
            });
        }
        Ok(Self(dim))
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has the expected dimension.
    pub fn validate_vector(&self, vector: &[f32]) -> Result<(), ClusterError> {
        if vector.len() != self.0 {
            return Err(ClusterError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl Default for FeatureDimension {
    fn default() -> Self {
        Self(DEFAULT_FEATURE_WIDTH)
    }
}

/// Errors that can occur during cluster store operations.
///
/// All error messages include actionable suggestions for resolution.
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error(
        "Cluster {id} is out of range (store holds {cluster_count} clusters)\nSuggestion: Only pass identities produced by the store's own classify or admit"
    )]
    OutOfRange { id: ClusterId, cluster_count: usize },

    #[error(
        "Feature dimension mismatch: expected {expected}, got {actual}\nSuggestion: Check the kernel half-width and the lower layer's embedding width"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "Cluster identities exhausted after {cluster_count} clusters\nSuggestion: Raise the distance threshold so fewer clusters are created"
    )]
    IdentitiesExhausted { cluster_count: usize },

    #[error("Invalid cluster store configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error(
        "Malformed cluster data at line {line}: {reason}\nSuggestion: The file is truncated or was written for a different feature width"
    )]
    MalformedPersistedData { line: usize, reason: String },

    #[error(
        "Cannot open cluster file '{}': {source}\nSuggestion: Check that the directory exists and you have read/write permissions",
        path.display()
    )]
    IoUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ClusterError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedPersistedData {
            line,
            reason: reason.into(),
        }
    }
}
