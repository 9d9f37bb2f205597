//! Online pattern clustering and layered scan-line classification.

pub mod cluster;
pub mod config;
pub mod display;
pub mod error;
pub mod io;
pub mod layer;
pub mod pipeline;
pub mod spatial;

// Explicit exports for better API clarity
pub use cluster::{Cluster, ClusterError, ClusterId, ClusterStore, EmbeddingSource};
pub use config::Settings;
pub use error::{EngineError, EngineResult};
pub use layer::{
    ImpulseLayer, ImpulseParams, LayerError, LayerParams, LayerStack, ScanLineLayer, StackParams,
};
pub use spatial::{Neighbor, Point2, SpatialError, SpatialIndex};
