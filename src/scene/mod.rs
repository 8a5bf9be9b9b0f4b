//! Debug scene content produced by the streaming engine

pub mod overlay;

pub use overlay::{LocalTransform, OverlayNode, OverlayScene, OverlayShape, WIREFRAME_CUBE_NAME};
