//! Error types for the point-cloud streaming engine

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Main error type for the engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Octant file does not exist: {}", .0.display())]
    MissingNodeFile(PathBuf),

    #[error("Malformed octant file {}: {reason}", path.display())]
    MalformedNodeFile { path: PathBuf, reason: String },

    /// The render set named an octant whose meshes are not in the cache.
    #[error("Trying to attach meshes that are not loaded yet (octant {0})")]
    MeshNotLoaded(Uuid),

    /// An octant was classified renderable without being visible.
    #[error("Unknown visibility state for octant {0}")]
    InconsistentVisibility(Uuid),

    #[error("Octree error: {0}")]
    Octree(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Streaming error: {0}")]
    Streaming(String),
}

impl Error {
    /// Whether this error only affects a single octant's data file.
    pub fn is_node_local(&self) -> bool {
        matches!(
            self,
            Error::MissingNodeFile(_) | Error::MalformedNodeFile { .. } | Error::Io(_)
        )
    }
}
