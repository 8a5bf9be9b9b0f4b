//! Visibility classification by screen-projected size
//!
//! Each traversal rebuilds the visible set from scratch: octants are expanded
//! in descending projected-size order until the point budget is spent or no
//! candidates remain. Visible octants without geometry are recorded in the
//! shared [`PendingSet`] for the loader.

use std::collections::HashMap;

use crate::core::camera::RenderView;
use crate::core::types::{Uuid, Vec3};
use crate::math::Frustum;
use crate::octree::{OctantId, OctantNode, Octree};
use crate::points::OctantMesh;
use crate::streaming::budget::PointBudget;
use crate::streaming::cache::LoadedMeshCache;
use crate::streaming::disk_io::OctantStore;
use crate::streaming::pending::{PendingOctant, PendingSet, PendingState};
use crate::streaming::priority::{OctantPriority, OctantPriorityQueue};

/// Camera-derived values shared by every octant of one traversal
struct TraversalFrame {
    frustum: Frustum,
    camera_pos: Vec3,
    viewport_height: u32,
    half_fov_slope: f32,
}

/// Per-frame frustum and screen-size classifier
pub struct VisibilityClassifier {
    visible: HashMap<Uuid, OctantId>,
    queue: OctantPriorityQueue,
    budget: PointBudget,
    /// Fraction of the root's projected size below which octants are skipped
    min_size_ratio: f64,
    min_projected_size: f64,
}

impl VisibilityClassifier {
    pub fn new(point_threshold: u64, min_size_ratio: f64) -> Self {
        Self {
            visible: HashMap::new(),
            queue: OctantPriorityQueue::new(),
            budget: PointBudget::new(point_threshold),
            min_size_ratio,
            min_projected_size: 0.0,
        }
    }

    /// Rebuild the visible set for the current view.
    ///
    /// Returns `false` without touching any state while the view is not set
    /// up yet.
    pub fn traverse<M: OctantMesh>(
        &mut self,
        octree: &mut Octree<M>,
        view: &RenderView,
        store: &OctantStore,
        pending: &PendingSet,
        cache: &LoadedMeshCache<M>,
    ) -> bool {
        if !view.is_initialized() {
            log::trace!("Skipping traversal, render view not initialized");
            return false;
        }
        let Some(half_fov_slope) = view.half_fov_slope() else {
            log::warn!("Skipping traversal, projection has no usable field of view");
            return false;
        };

        self.visible.clear();
        self.queue.clear();
        self.budget.reset();

        let frame = TraversalFrame {
            frustum: Frustum::from_view_projection(&view.view_projection()),
            camera_pos: view.camera_position(),
            viewport_height: view.viewport_height,
            half_fov_slope,
        };

        let root = octree.root();
        let root_size = octree[root].compute_screen_projected_size(
            frame.camera_pos,
            frame.viewport_height,
            frame.half_fov_slope,
        );
        self.min_projected_size = root_size * self.min_size_ratio;

        self.evaluate(octree, root, &frame, pending);

        while self.budget.has_capacity() {
            let Some(next) = self.queue.pop() else {
                break;
            };

            let node = &octree[next.id];
            let is_leaf = node.is_leaf;
            let points = Self::point_count(node, next.projected_size, store, pending, cache);

            self.visible.insert(next.guid, next.id);
            self.budget.add(points as u64);

            if !is_leaf {
                for child in octree.children(next.id).into_iter().flatten() {
                    self.evaluate(octree, child, &frame, pending);
                }
            }
        }

        log::debug!(
            "Traversal: {} visible octants, {} points (threshold {}), {} pending",
            self.visible.len(),
            self.budget.visible(),
            self.budget.threshold(),
            pending.len()
        );
        true
    }

    /// Frustum and size test; enqueue the octant or drop it from the pending set.
    fn evaluate<M>(
        &mut self,
        octree: &mut Octree<M>,
        id: OctantId,
        frame: &TraversalFrame,
        pending: &PendingSet,
    ) {
        let node = &mut octree[id];

        if !frame.frustum.intersects_aabb(&node.aabb()) {
            pending.remove(&node.guid);
            return;
        }

        let size = node.compute_screen_projected_size(
            frame.camera_pos,
            frame.viewport_height,
            frame.half_fov_slope,
        );
        if size < self.min_projected_size {
            log::trace!("Octant {} too small on screen ({:.1}px)", node.guid, size);
            pending.remove(&node.guid);
            return;
        }

        self.queue.push(OctantPriority::new(id, node.guid, size));
    }

    /// Points an octant contributes to the budget.
    ///
    /// Octants without geometry are registered as pending; ones already
    /// pending keep their first estimate and only get a new priority.
    fn point_count<M: OctantMesh>(
        node: &OctantNode<M>,
        priority: f64,
        store: &OctantStore,
        pending: &PendingSet,
        cache: &LoadedMeshCache<M>,
    ) -> u32 {
        // Loaded means cached; the node's own flag may be stale
        if let Some(count) = cache.point_count(&node.guid) {
            return count;
        }
        if let Some(entry) = pending.refresh(&node.guid, priority) {
            return match entry.state {
                PendingState::Failed => 0,
                PendingState::Queued | PendingState::Loading => entry.point_estimate,
            };
        }

        let estimate = if node.point_count > 0 {
            Ok(node.point_count)
        } else {
            store.read_point_count(node.guid)
        };

        match estimate {
            Ok(count) => {
                pending.insert(node.guid, PendingOctant::queued(node.id, priority, count));
                count
            }
            Err(e) => {
                log::warn!("Cannot read header of octant {}: {}", node.guid, e);
                pending.insert(node.guid, PendingOctant::failed(node.id, priority));
                0
            }
        }
    }

    /// Octants found visible by the last traversal
    pub fn visible_set(&self) -> &HashMap<Uuid, OctantId> {
        &self.visible
    }

    pub fn is_visible(&self, guid: &Uuid) -> bool {
        self.visible.contains_key(guid)
    }

    /// Points accounted for by the last traversal
    pub fn visible_point_count(&self) -> u64 {
        self.budget.visible()
    }

    pub fn point_threshold(&self) -> u64 {
        self.budget.threshold()
    }

    pub fn set_point_threshold(&mut self, threshold: u64) {
        self.budget.set_threshold(threshold);
    }

    /// Minimum projected size used by the last traversal
    pub fn min_projected_size(&self) -> f64 {
        self.min_projected_size
    }

    /// Forget all visibility state
    pub fn clear(&mut self) {
        self.visible.clear();
        self.queue.clear();
        self.budget.reset();
        self.min_projected_size = 0.0;
    }
}
