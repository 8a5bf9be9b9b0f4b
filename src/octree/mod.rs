//! Point-cloud octree: octant nodes and the arena that owns them

pub mod node;
pub mod tree;

pub use node::{OctantId, OctantNode};
pub use tree::Octree;
