//! Online nearest-centroid cluster store.
//!
//! Unlike batch K-means this store never re-runs over past data: every
//! admitted vector either moves the nearest centroid (incremental mean) or,
//! when nothing lies within the distance threshold, opens a new cluster.
//!
//! # Algorithm Details
//! - Distance metric: Euclidean
//! - Admission: nearest centroid within `distance_threshold`, else create
//! - Ties: earliest created cluster wins
//! - Cost: O(clusters * width) per call

use std::collections::HashMap;

use tracing::debug;

use crate::cluster::types::{
    ClusterError, ClusterId, DEFAULT_EMBEDDING_DIM, DEFAULT_FEATURE_WIDTH, FeatureDimension,
};

/// A single cluster: running mean of its members plus a narrower embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub(super) centroid: Vec<f32>,
    pub(super) embedding: Vec<f32>,
    pub(super) id: ClusterId,
    pub(super) member_count: u32,
}

impl Cluster {
    fn from_first_member(initial: &[f32], id: ClusterId, embedding_dim: usize) -> Self {
        Self {
            centroid: initial.to_vec(),
            embedding: project(initial, embedding_dim),
            id,
            member_count: 1,
        }
    }

    /// Folds a new member into the centroid and the embedding.
    ///
    /// The embedding takes the leading components of `member`, so `member`
    /// must be at least as wide as the embedding.
    fn absorb(&mut self, member: &[f32]) {
        let count = self.member_count as f32;
        let next = count + 1.0;

        for (value, &x) in self.centroid.iter_mut().zip(member) {
            *value = (*value * count + x) / next;
        }
        for (value, &x) in self.embedding.iter_mut().zip(member) {
            *value = (*value * count + x) / next;
        }

        self.member_count += 1;
    }

    /// Identity assigned at creation.
    #[must_use]
    pub fn id(&self) -> ClusterId {
        self.id
    }

    /// Running mean of every admitted vector.
    #[must_use]
    pub fn centroid(&self) -> &[f32] {
        &self.centroid
    }

    /// Fixed-width projection handed to the layer above.
    #[must_use]
    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    /// Number of vectors admitted into this cluster (always >= 1).
    #[must_use]
    pub fn member_count(&self) -> u32 {
        self.member_count
    }
}

/// Truncates or zero-pads `pattern` to `width` components.
#[must_use]
pub fn project(pattern: &[f32], width: usize) -> Vec<f32> {
    let mut embedding = vec![0.0; width];
    let n = pattern.len().min(width);
    embedding[..n].copy_from_slice(&pattern[..n]);
    embedding
}

/// Computes the Euclidean distance between two vectors.
///
/// # Returns
/// * Distance in `[0, inf)`, where 0 means identical
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Incremental cluster store with persisted discrete embeddings.
///
/// Each store owns its identity counter and embedding table; nothing is
/// shared between stores.
#[derive(Debug, Clone)]
pub struct ClusterStore {
    /// Clusters in creation order.
    pub(super) clusters: Vec<Cluster>,

    /// Embedding identity to embedding. Mirrors `Cluster::embedding`.
    pub(super) embeddings: HashMap<ClusterId, Vec<f32>>,

    /// Identity handed to the next created cluster.
    pub(super) next_id: ClusterId,

    distance_threshold: f32,
    feature_width: FeatureDimension,
    embedding_dim: usize,
}

impl ClusterStore {
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `distance_threshold` - Maximum Euclidean distance for a vector to join a cluster
    /// * `feature_width` - Width of every feature vector presented to the store
    /// * `embedding_dim` - Width of the embedding derived for each cluster
    ///
    /// # Errors
    /// `InvalidConfig` if the threshold is negative or not finite, or if the
    /// embedding is wider than the feature vectors it is projected from.
    pub fn new(
        distance_threshold: f32,
        feature_width: usize,
        embedding_dim: usize,
    ) -> Result<Self, ClusterError> {
        if !distance_threshold.is_finite() || distance_threshold < 0.0 {
            return Err(ClusterError::InvalidConfig {
                reason: format!(
                    "distance threshold must be a finite non-negative number, got {distance_threshold}"
                ),
            });
        }

        let feature_width = FeatureDimension::new(feature_width)?;
        if embedding_dim == 0 || embedding_dim > feature_width.get() {
            return Err(ClusterError::InvalidConfig {
                reason: format!(
                    "embedding width {embedding_dim} must be between 1 and the feature width {}",
                    feature_width.get()
                ),
            });
        }

        Ok(Self {
            clusters: Vec::new(),
            embeddings: HashMap::new(),
            next_id: ClusterId::new(0),
            distance_threshold,
            feature_width,
            embedding_dim,
        })
    }

    /// Creates an empty store with the default 5-wide features and embeddings.
    pub fn with_threshold(distance_threshold: f32) -> Result<Self, ClusterError> {
        Self::new(
            distance_threshold,
            DEFAULT_FEATURE_WIDTH,
            DEFAULT_EMBEDDING_DIM,
        )
    }

    /// Finds the cluster nearest to `vector` if it lies within the threshold.
    ///
    /// Read-only. Returns `None` for an empty store or when the nearest
    /// centroid is farther than `distance_threshold`.
    pub fn classify(&self, vector: &[f32]) -> Result<Option<ClusterId>, ClusterError> {
        self.feature_width.validate_vector(vector)?;
        Ok(self.nearest_within_threshold(vector).map(|i| self.clusters[i].id))
    }

    /// Admits `vector`: updates the nearest cluster within the threshold or
    /// creates a new one.
    ///
    /// # Returns
    /// * The identity of the cluster that was updated or created
    pub fn admit(&mut self, vector: &[f32]) -> Result<ClusterId, ClusterError> {
        self.feature_width.validate_vector(vector)?;

        if let Some(index) = self.nearest_within_threshold(vector) {
            let cluster = &mut self.clusters[index];
            cluster.absorb(vector);
            self.embeddings.insert(cluster.id, cluster.embedding.clone());
            return Ok(cluster.id);
        }

        let id = self.next_id;
        let next_id = id.checked_next().ok_or(ClusterError::IdentitiesExhausted {
            cluster_count: self.clusters.len(),
        })?;
        let cluster = Cluster::from_first_member(vector, id, self.embedding_dim);
        self.embeddings.insert(id, cluster.embedding.clone());
        self.clusters.push(cluster);
        self.next_id = next_id;

        debug!(
            cluster = id.get(),
            total = self.clusters.len(),
            "created cluster"
        );
        Ok(id)
    }

    /// Returns the embedding stored for `id`.
    pub fn embedding_of(&self, id: ClusterId) -> Result<&[f32], ClusterError> {
        self.embeddings
            .get(&id)
            .map(Vec::as_slice)
            .ok_or(ClusterError::OutOfRange {
                id,
                cluster_count: self.clusters.len(),
            })
    }

    /// Looks up a cluster by identity.
    #[must_use]
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        // Identities equal creation indices unless a hand-edited file was loaded.
        match self.clusters.get(id.get() as usize) {
            Some(cluster) if cluster.id == id => Some(cluster),
            _ => self.clusters.iter().find(|c| c.id == id),
        }
    }

    /// All clusters in creation order.
    #[must_use]
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Number of clusters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Returns true if nothing has been admitted or loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Identity the next created cluster will receive.
    #[must_use]
    pub fn next_id(&self) -> ClusterId {
        self.next_id
    }

    #[must_use]
    pub fn distance_threshold(&self) -> f32 {
        self.distance_threshold
    }

    #[must_use]
    pub fn feature_width(&self) -> usize {
        self.feature_width.get()
    }

    #[must_use]
    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    fn nearest_within_threshold(&self, vector: &[f32]) -> Option<usize> {
        let mut best_distance = f32::INFINITY;
        let mut best_index = None;

        for (i, cluster) in self.clusters.iter().enumerate() {
            let distance = euclidean_distance(&cluster.centroid, vector);
            // Strict comparison keeps the earliest cluster on ties
            if distance < best_distance {
                best_distance = distance;
                best_index = Some(i);
            }
        }

        best_index.filter(|_| best_distance <= self.distance_threshold)
    }
}
