//! Bottom-up composition of an impulse layer and scan-line layers.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cluster::{ClusterError, ClusterId, ClusterStore};
use crate::layer::{ImpulseLayer, ImpulseParams, LayerError, LayerParams, ScanLineLayer};

/// File name used for the clusters of `level` inside a state directory.
#[must_use]
pub fn level_file_name(level: usize) -> String {
    format!("level_{level}.clusters")
}

/// Summary of one level's cluster store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelStats {
    pub level: usize,
    pub clusters: usize,
    /// Total vectors admitted across all clusters.
    pub members: u64,
    pub feature_width: usize,
    pub embedding_dim: usize,
    pub distance_threshold: f32,
}

impl LevelStats {
    fn of(level: usize, store: &ClusterStore) -> Self {
        Self {
            level,
            clusters: store.len(),
            members: store
                .clusters()
                .iter()
                .map(|cluster| u64::from(cluster.member_count()))
                .sum(),
            feature_width: store.feature_width(),
            embedding_dim: store.embedding_dim(),
            distance_threshold: store.distance_threshold(),
        }
    }
}

/// Parameters for a full stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackParams {
    pub impulse: ImpulseParams,
    /// Template for every scan-line level.
    pub scanline: LayerParams,
    /// Number of scan-line levels above the impulse layer.
    pub depth: usize,
}

/// An impulse layer (level 0) with `depth` scan-line layers stacked on top.
///
/// Within a tick, level `n` always steps before level `n + 1` and sees the
/// output level `n` produced in that same tick.
#[derive(Debug, Clone)]
pub struct LayerStack {
    impulse: ImpulseLayer,
    layers: Vec<ScanLineLayer>,
}

impl LayerStack {
    pub fn new(params: StackParams) -> Result<Self, LayerError> {
        if params.scanline.height != params.impulse.layer.height {
            return Err(LayerError::InvalidConfig {
                reason: format!(
                    "scan-line height {} differs from impulse height {}",
                    params.scanline.height, params.impulse.layer.height
                ),
            });
        }

        let impulse = ImpulseLayer::new(params.impulse)?;
        let mut layers = Vec::with_capacity(params.depth);
        let mut lower_dim = params.impulse.layer.embedding_dim;
        for _ in 0..params.depth {
            layers.push(ScanLineLayer::new(params.scanline, lower_dim)?);
            lower_dim = params.scanline.embedding_dim;
        }

        debug!(
            depth = params.depth,
            height = params.impulse.layer.height,
            "layer stack created"
        );
        Ok(Self { impulse, layers })
    }

    /// Advances every level by one tick and returns the top level's output.
    pub fn step(&mut self, column: &[bool]) -> Result<&[Option<ClusterId>], LayerError> {
        self.impulse.step(column)?;

        for level in 0..self.layers.len() {
            let (below, rest) = self.layers.split_at_mut(level);
            let layer = &mut rest[0];
            match below.last() {
                Some(lower) => layer.step(lower.classifications(), lower.store())?,
                None => layer.step(self.impulse.classifications(), self.impulse.store())?,
            };
        }

        Ok(self.output())
    }

    /// Output of the highest level for the last tick.
    #[must_use]
    pub fn output(&self) -> &[Option<ClusterId>] {
        match self.layers.last() {
            Some(top) => top.classifications(),
            None => self.impulse.classifications(),
        }
    }

    /// Output of `level` for the last tick.
    pub fn output_at(&self, level: usize) -> Result<&[Option<ClusterId>], LayerError> {
        match level {
            0 => Ok(self.impulse.classifications()),
            n => self
                .layers
                .get(n - 1)
                .map(ScanLineLayer::classifications)
                .ok_or(LayerError::LevelOutOfRange {
                    level,
                    levels: self.levels(),
                }),
        }
    }

    /// Puts `level` into learning mode and every other level into recognition.
    pub fn set_training_level(&mut self, level: usize) -> Result<(), LayerError> {
        if level >= self.levels() {
            return Err(LayerError::LevelOutOfRange {
                level,
                levels: self.levels(),
            });
        }
        self.impulse.set_learning(level == 0);
        for (n, layer) in self.layers.iter_mut().enumerate() {
            layer.set_learning(level == n + 1);
        }
        debug!(level, "training level set");
        Ok(())
    }

    /// Puts every level into recognition mode.
    pub fn set_recognition(&mut self) {
        self.impulse.set_learning(false);
        for layer in &mut self.layers {
            layer.set_learning(false);
        }
    }

    /// Clears all per-tick state, keeping learned clusters. Call between images.
    pub fn reset(&mut self) {
        self.impulse.reset();
        for layer in &mut self.layers {
            layer.reset();
        }
    }

    /// Total number of levels including the impulse layer.
    #[must_use]
    pub fn levels(&self) -> usize {
        self.layers.len() + 1
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.impulse.height()
    }

    pub fn impulse(&self) -> &ImpulseLayer {
        &self.impulse
    }

    pub fn scanline(&self, level: usize) -> Option<&ScanLineLayer> {
        level.checked_sub(1).and_then(|n| self.layers.get(n))
    }

    /// Cluster store backing `level`.
    pub fn store(&self, level: usize) -> Option<&ClusterStore> {
        match level {
            0 => Some(self.impulse.store()),
            n => self.layers.get(n - 1).map(ScanLineLayer::store),
        }
    }

    /// Cluster count per level, bottom first.
    #[must_use]
    pub fn level_sizes(&self) -> Vec<usize> {
        std::iter::once(self.impulse.store().len())
            .chain(self.layers.iter().map(|layer| layer.store().len()))
            .collect()
    }

    /// Per-level store summaries, bottom first.
    #[must_use]
    pub fn level_stats(&self) -> Vec<LevelStats> {
        (0..self.levels())
            .filter_map(|level| self.store(level).map(|store| LevelStats::of(level, store)))
            .collect()
    }

    /// Writes every level to `dir`, creating it if needed.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), ClusterError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| ClusterError::IoUnavailable {
            path: dir.to_path_buf(),
            source,
        })?;

        self.impulse.save_clusters(dir.join(level_file_name(0)))?;
        for (n, layer) in self.layers.iter().enumerate() {
            layer.save_clusters(dir.join(level_file_name(n + 1)))?;
        }

        info!(dir = %dir.display(), levels = self.levels(), "saved layer stack");
        Ok(())
    }

    /// Loads every level from `dir`.
    ///
    /// Either all levels are replaced or, on any failure, none are.
    pub fn load(&mut self, dir: impl AsRef<Path>) -> Result<(), ClusterError> {
        let dir = dir.as_ref();

        let impulse = load_level(self.impulse.store(), dir, 0)?;
        let mut upper = Vec::with_capacity(self.layers.len());
        for (n, layer) in self.layers.iter().enumerate() {
            upper.push(load_level(layer.store(), dir, n + 1)?);
        }

        *self.impulse.store_mut() = impulse;
        for (layer, store) in self.layers.iter_mut().zip(upper) {
            *layer.store_mut() = store;
        }

        info!(dir = %dir.display(), sizes = ?self.level_sizes(), "loaded layer stack");
        Ok(())
    }
}

/// Loads `level` into a copy of `current`, leaving `current` untouched.
fn load_level(
    current: &ClusterStore,
    dir: &Path,
    level: usize,
) -> Result<ClusterStore, ClusterError> {
    let mut store = current.clone();
    store
        .load(dir.join(level_file_name(level)))
        .inspect_err(|e| warn!(level, error = %e, "layer stack not loaded"))?;
    Ok(store)
}
