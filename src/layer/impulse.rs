//! Bottom layer turning raw on/off activations into cluster ids.

use std::mem;
use std::path::Path;

use tracing::debug;

use crate::cluster::{ClusterError, ClusterId, ClusterStore};
use crate::layer::{LayerError, LayerParams, decay_value};

/// Parameters of the impulse layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpulseParams {
    pub layer: LayerParams,
    /// Decayed values below this floor drop to zero.
    pub memory_threshold: f32,
    /// Value written into a row's memory when it activates.
    pub impulse_strength: f32,
}

impl ImpulseParams {
    fn validate(&self) -> Result<(), LayerError> {
        self.layer.validate()?;
        if !(self.memory_threshold >= 0.0 && self.memory_threshold.is_finite()) {
            return Err(LayerError::InvalidConfig {
                reason: format!(
                    "memory threshold must be finite and non-negative, got {}",
                    self.memory_threshold
                ),
            });
        }
        if !(self.impulse_strength > 0.0 && self.impulse_strength.is_finite()) {
            return Err(LayerError::InvalidConfig {
                reason: format!(
                    "impulse strength must be finite and positive, got {}",
                    self.impulse_strength
                ),
            });
        }
        Ok(())
    }
}

/// Decaying impulse memory over raw activations.
///
/// An activation at row `y` writes `impulse_strength` into the memory and is
/// summarized on the following tick, once the impulse has decayed once and
/// its neighbours have had a chance to fire. The window is the `2k + 1`
/// memory values centered on `y`.
#[derive(Debug, Clone)]
pub struct ImpulseLayer {
    memory: Vec<f32>,
    pending: Vec<usize>,
    output: Vec<Option<ClusterId>>,
    decay_rate: f32,
    memory_threshold: f32,
    impulse_strength: f32,
    half_width: usize,
    learning: bool,
    store: ClusterStore,
}

impl ImpulseLayer {
    pub fn new(params: ImpulseParams) -> Result<Self, LayerError> {
        params.validate()?;
        let layer = params.layer;
        let store = ClusterStore::new(
            layer.distance_threshold,
            layer.kernel_len(),
            layer.embedding_dim,
        )?;
        Ok(Self {
            memory: vec![0.0; layer.height],
            pending: Vec::new(),
            output: vec![None; layer.height],
            decay_rate: layer.decay_rate,
            memory_threshold: params.memory_threshold,
            impulse_strength: params.impulse_strength,
            half_width: layer.half_width,
            learning: layer.learning,
            store,
        })
    }

    /// Advances one tick with the activations of the current column.
    ///
    /// Returns the ids assigned to last tick's activations. In learning mode
    /// every slot is `None`.
    pub fn step(&mut self, column: &[bool]) -> Result<&[Option<ClusterId>], LayerError> {
        let height = self.memory.len();
        if column.len() != height {
            return Err(LayerError::ColumnLength {
                expected: height,
                actual: column.len(),
            });
        }

        let (rate, floor) = (self.decay_rate, self.memory_threshold);
        for value in &mut self.memory {
            let decayed = decay_value(*value, rate);
            *value = if decayed < floor { 0.0 } else { decayed };
        }
        self.output.fill(None);

        let k = self.half_width;
        let pending = mem::take(&mut self.pending);
        for &y in &pending {
            if y < k || y + k >= height {
                continue;
            }
            let window = &self.memory[y - k..=y + k];
            if self.learning {
                let id = self.store.admit(window)?;
                debug!(row = y, cluster = %id, "impulse admitted");
            } else {
                self.output[y] = self.store.classify(window)?;
            }
        }

        self.pending = pending;
        self.pending.clear();
        for (y, _) in column.iter().enumerate().filter(|(_, on)| **on) {
            self.memory[y] = self.impulse_strength;
            self.pending.push(y);
        }

        Ok(&self.output)
    }

    /// Ids produced during the last tick.
    #[must_use]
    pub fn classifications(&self) -> &[Option<ClusterId>] {
        &self.output
    }

    #[must_use]
    pub fn memory(&self) -> &[f32] {
        &self.memory
    }

    /// Clears memory, output and any activation still waiting for its tick.
    pub fn reset(&mut self) {
        self.memory.fill(0.0);
        self.output.fill(None);
        self.pending.clear();
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
