//! Octant node types
//!
//! Octant nodes are owned by the [`Octree`](super::Octree) arena and addressed by
//! [`OctantId`]. Their streaming state is only ever touched from the thread that
//! owns the octree; the background loader works purely on GUIDs.

use std::sync::Arc;

use crate::core::types::{Uuid, Vec3};
use crate::math::Aabb;

/// Index of an octant inside its octree arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OctantId(pub u32);

impl OctantId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node of the point-cloud octree.
#[derive(Debug)]
pub struct OctantNode<M> {
    pub id: OctantId,
    /// Stable identifier, used as cache key and on-disk file name.
    pub guid: Uuid,
    pub center: Vec3,
    /// Edge length of the octant cube.
    pub size: f32,
    pub parent: Option<OctantId>,
    pub children: [Option<OctantId>; 8],
    /// Index of this octant in its parent (0-7).
    pub pos_in_parent: u8,
    pub is_leaf: bool,

    pub was_loaded: bool,
    /// Number of points in the octant, 0 until known.
    pub point_count: u32,
    /// Screen-projected size in pixels, recomputed every traversal.
    pub projected_screen_size: f64,
    /// Bitmask of children currently in the render set (hierarchy texture only).
    pub visible_child_indices: u8,
    /// Texel slot assigned by the last hierarchy texture encode.
    pub pos_in_hierarchy_tex: u32,

    /// Geometry currently attached for rendering.
    pub meshes: Option<Arc<[M]>>,
}

impl<M> OctantNode<M> {
    pub(crate) fn new(id: OctantId, guid: Uuid, center: Vec3, size: f32) -> Self {
        Self {
            id,
            guid,
            center,
            size,
            parent: None,
            children: [None; 8],
            pos_in_parent: 0,
            is_leaf: true,
            was_loaded: false,
            point_count: 0,
            projected_screen_size: 0.0,
            visible_child_indices: 0,
            pos_in_hierarchy_tex: 0,
            meshes: None,
        }
    }

    /// Bounding box of the octant
    pub fn aabb(&self) -> Aabb {
        Aabb::from_center_size(self.center, self.size)
    }

    /// Present children, in octant order
    pub fn child_ids(&self) -> impl Iterator<Item = OctantId> + '_ {
        self.children.iter().flatten().copied()
    }

    /// Pinhole-camera estimate of the octant's size on screen, in pixels.
    ///
    /// `half_fov_slope` is `tan(fov_y / 2)`.
    pub fn compute_screen_projected_size(
        &mut self,
        camera_pos: Vec3,
        viewport_height: u32,
        half_fov_slope: f32,
    ) -> f64 {
        let distance = (self.center.as_dvec3() - camera_pos.as_dvec3()).length().max(f64::EPSILON);
        self.projected_screen_size =
            viewport_height as f64 / 2.0 * self.size as f64 / (half_fov_slope as f64 * distance);
        self.projected_screen_size
    }

    /// Replace any attached geometry, returning the previous one.
    pub fn attach_meshes(&mut self, meshes: Arc<[M]>) -> Option<Arc<[M]>> {
        self.meshes.replace(meshes)
    }

    /// Remove attached geometry.
    pub fn detach_meshes(&mut self) -> Option<Arc<[M]>> {
        self.meshes.take()
    }

    pub fn has_meshes(&self) -> bool {
        self.meshes.is_some()
    }

    /// Drop all streaming state, returning any geometry that was attached.
    /// The point count is kept as a load estimate.
    pub fn reset_streaming_state(&mut self) -> Option<Arc<[M]>> {
        self.was_loaded = false;
        self.projected_screen_size = 0.0;
        self.visible_child_indices = 0;
        self.pos_in_hierarchy_tex = 0;
        self.detach_meshes()
    }
}
