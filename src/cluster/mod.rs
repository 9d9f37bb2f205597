//! Online pattern clustering with discrete embeddings.
//!
//! A [`ClusterStore`] keeps a growing list of clusters. Each cluster has a
//! centroid (running mean of everything admitted into it) and a narrower
//! embedding that higher layers use as a compact identity signal.
//!
//! # Architecture
//! The store is greedy and online: a single distance threshold decides
//! whether a vector joins its nearest cluster or founds a new one, so the
//! number of clusters is driven by the data rather than a fixed `k`.
//! Stores persist to a whitespace-delimited text format, one cluster per line.

mod persist;
mod store;
mod types;

// Re-export core types for public API
pub use store::{Cluster, ClusterStore, euclidean_distance, project};
pub use types::{
    ClusterError, ClusterId, DEFAULT_EMBEDDING_DIM, DEFAULT_FEATURE_WIDTH, FeatureDimension,
};

/// Read access to the embeddings of a lower layer.
///
/// A scan-line layer only ever needs a lower layer's embedding for the
/// cluster an event carries, so it depends on this seam rather than on a
/// concrete store.
pub trait EmbeddingSource {
    /// Returns the embedding for `id`.
    fn embedding_of(&self, id: ClusterId) -> Result<&[f32], ClusterError>;

    /// Width of the embeddings this source hands out.
    fn embedding_dim(&self) -> usize;
}

impl EmbeddingSource for ClusterStore {
    fn embedding_of(&self, id: ClusterId) -> Result<&[f32], ClusterError> {
        ClusterStore::embedding_of(self, id)
    }

    fn embedding_dim(&self) -> usize {
        ClusterStore::embedding_dim(self)
    }
}
