//! Scan-line layer fed by the cluster ids of a lower layer.

use std::path::Path;

use crate::cluster::{ClusterError, ClusterId, ClusterStore, EmbeddingSource};
use crate::layer::{LayerError, LayerParams, MAX_ACTIVATION, decay_value};

/// Decaying per-row memory that turns lower-layer events into feature windows.
///
/// Each window is the `2k + 1` decayed scalars centered on the firing row
/// followed by the lower layer's embedding for the event's cluster. Rows
/// closer than `k` to either edge never produce a window.
#[derive(Debug, Clone)]
pub struct ScanLineLayer {
    memory: Vec<f32>,
    classification: Vec<Option<ClusterId>>,
    decay_rate: f32,
    half_width: usize,
    learning: bool,
    store: ClusterStore,
}

impl ScanLineLayer {
    /// Creates a layer whose store accepts windows built against a lower
    /// layer with `lower_embedding_dim`-wide embeddings.
    pub fn new(params: LayerParams, lower_embedding_dim: usize) -> Result<Self, LayerError> {
        params.validate()?;
        let store = ClusterStore::new(
            params.distance_threshold,
            params.kernel_len() + lower_embedding_dim,
            params.embedding_dim,
        )?;
        Ok(Self::with_store(params, store))
    }

    /// Creates a layer around an existing store.
    pub fn with_store(params: LayerParams, store: ClusterStore) -> Self {
        Self {
            memory: vec![0.0; params.height],
            classification: vec![None; params.height],
            decay_rate: params.decay_rate,
            half_width: params.half_width,
            learning: params.learning,
            store,
        }
    }

    /// Advances one tick.
    ///
    /// `events[y]` carries the lower layer's cluster for row `y`, if any.
    /// Returns this tick's classifications, valid until the next call. In
    /// learning mode every slot is `None`.
    ///
    /// # Errors
    /// `ColumnLength` if `events` does not match the layer height; `OutOfRange`
    /// if an event names a cluster `lower` does not know. Rows processed
    /// before the failing one keep their updates.
    pub fn step<S>(
        &mut self,
        events: &[Option<ClusterId>],
        lower: &S,
    ) -> Result<&[Option<ClusterId>], LayerError>
    where
        S: EmbeddingSource + ?Sized,
    {
        let height = self.memory.len();
        if events.len() != height {
            return Err(LayerError::ColumnLength {
                expected: height,
                actual: events.len(),
            });
        }

        self.decay();

        let k = self.half_width;
        let mut window = Vec::with_capacity(self.store.feature_width());

        for y in k..height.saturating_sub(k) {
            let Some(id) = events[y] else {
                continue;
            };

            self.memory[y] = MAX_ACTIVATION;
            window.clear();
            window.extend_from_slice(&self.memory[y - k..=y + k]);
            window.extend_from_slice(lower.embedding_of(id)?);

            if self.learning {
                self.store.admit(&window)?;
            } else {
                self.classification[y] = self.store.classify(&window)?;
            }
        }

        Ok(&self.classification)
    }

    fn decay(&mut self) {
        let rate = self.decay_rate;
        for value in &mut self.memory {
            *value = decay_value(*value, rate);
        }
        self.classification.fill(None);
    }

    /// Classification produced for row `y` during the last tick.
    pub fn classification_at(&self, y: usize) -> Result<Option<ClusterId>, LayerError> {
        self.classification
            .get(y)
            .copied()
            .ok_or(LayerError::RowOutOfRange {
                row: y,
                height: self.memory.len(),
            })
    }

    /// Classifications produced during the last tick.
    #[must_use]
    pub fn classifications(&self) -> &[Option<ClusterId>] {
        &self.classification
    }

    /// Current decayed memory, one value per row.
    #[must_use]
    pub fn memory(&self) -> &[f32] {
        &self.memory
    }

    /// Zeroes the memory and clears classifications, keeping learned clusters.
    pub fn reset(&mut self) {
        self.memory.fill(0.0);
        self.classification.fill(None);
    }

    pub fn set_learning(&mut self, learning: bool) {
        self.learning = learning;
    }

    #[must_use]
    pub fn is_learning(&self) -> bool {
        self.learning
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.memory.len()
    }

    #[must_use]
    pub fn half_width(&self) -> usize {
        self.half_width
    }

    #[must_use]
    pub fn store(&self) -> &ClusterStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut ClusterStore {
        &mut self.store
    }

    pub fn save_clusters(&self, path: impl AsRef<Path>) -> Result<(), ClusterError> {
        self.store.save(path)
    }

    pub fn load_clusters(&mut self, path: impl AsRef<Path>) -> Result<(), ClusterError> {
        self.store.load(path)
    }
}
