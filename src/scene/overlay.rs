//! Debug overlay scene for visualizing streamed octants
//!
//! The overlay is a flat list of named nodes the host renders on top of the
//! point cloud. Octant wireframes are tagged with [`WIREFRAME_CUBE_NAME`] so
//! they can be removed again without touching other overlay content.

use crate::core::types::Vec3;

/// Name given to octant wireframe nodes
pub const WIREFRAME_CUBE_NAME: &str = "WireframeCube";

/// Translation and uniform scale of an overlay node
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalTransform {
    pub position: Vec3,
    pub scale: f32,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

/// What an overlay node draws
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayShape {
    /// Unit wireframe cube, scaled by the node transform
    WireframeCube,
    /// Host-defined marker
    Marker,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverlayNode {
    pub name: String,
    pub transform: LocalTransform,
    pub shape: OverlayShape,
}

impl OverlayNode {
    /// Wireframe cube covering an octant
    pub fn wireframe_cube(center: Vec3, size: f32) -> Self {
        Self {
            name: WIREFRAME_CUBE_NAME.to_string(),
            transform: LocalTransform { position: center, scale: size },
            shape: OverlayShape::WireframeCube,
        }
    }
}

/// Debug overlay scene
#[derive(Clone, Debug, Default)]
pub struct OverlayScene {
    pub children: Vec<OverlayNode>,
}

impl OverlayScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every node with the given name. Returns how many were removed.
    pub fn remove_named(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children.retain(|node| node.name != name);
        before - self.children.len()
    }

    /// Number of octant wireframes currently in the scene
    pub fn wireframe_count(&self) -> usize {
        self.children.iter().filter(|n| n.name == WIREFRAME_CUBE_NAME).count()
    }
}
