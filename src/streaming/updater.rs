//! Scene reconciliation
//!
//! Once per update interval the updater brings octree nodes in line with the
//! latest traversal: invisible octants lose their geometry, renderable ones
//! get their cached geometry attached, and octants still loading are left
//! alone.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::core::error::Error;
use crate::core::time::UpdateTimer;
use crate::core::types::{Result, Uuid};
use crate::octree::{OctantId, Octree};
use crate::points::OctantMesh;
use crate::streaming::cache::{dispose_all, LoadedMeshCache};
use crate::streaming::pending::PendingSet;

/// What a reconciliation does with one octant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OctantVisibility {
    /// Not visible: release geometry
    Invisible,
    /// Visible and loaded: attach geometry
    Renderable,
    /// Visible, waiting for the loader: leave as is
    Awaiting,
}

impl OctantVisibility {
    /// Classify from set membership; render set membership implies visibility.
    pub fn classify(guid: Uuid, visible: bool, renderable: bool) -> Result<Self> {
        match (visible, renderable) {
            (false, false) => Ok(Self::Invisible),
            (true, true) => Ok(Self::Renderable),
            (true, false) => Ok(Self::Awaiting),
            (false, true) => Err(Error::InconsistentVisibility(guid)),
        }
    }
}

/// Counts from one reconciliation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub attached: usize,
    pub evicted: usize,
    pub awaiting: usize,
}

/// Throttled scene updater
pub struct SceneUpdater {
    timer: UpdateTimer,
    render_set: HashSet<Uuid>,
    reconciliations: u64,
}

impl SceneUpdater {
    pub fn new(interval: Duration) -> Self {
        Self {
            timer: UpdateTimer::new(interval),
            render_set: HashSet::new(),
            reconciliations: 0,
        }
    }

    /// Advance the throttle. True when a reconciliation is due.
    ///
    /// The interval restarts whenever it elapses, even if the user is moving
    /// and the reconciliation is skipped.
    pub fn tick(&mut self, delta: Duration, user_moving: bool) -> bool {
        self.timer.tick(delta) && !user_moving
    }

    /// Render set = visible octants that are not pending
    pub fn compute_render_set(&mut self, visible: &HashMap<Uuid, OctantId>, pending: &PendingSet) {
        self.render_set.clear();
        self.render_set.extend(
            visible
                .keys()
                .filter(|guid| !pending.contains(guid))
                .copied(),
        );
    }

    /// Walk the octree from the root and attach or release geometry.
    pub fn reconcile<M: OctantMesh>(
        &mut self,
        octree: &mut Octree<M>,
        visible: &HashMap<Uuid, OctantId>,
        pending: &PendingSet,
        cache: &LoadedMeshCache<M>,
    ) -> Result<ReconcileSummary> {
        self.compute_render_set(visible, pending);

        let mut summary = ReconcileSummary::default();
        let mut stack = vec![octree.root()];

        while let Some(id) = stack.pop() {
            let node = &mut octree[id];
            let guid = node.guid;
            node.visible_child_indices = 0;

            let state = OctantVisibility::classify(
                guid,
                visible.contains_key(&guid),
                self.render_set.contains(&guid),
            )?;

            match state {
                OctantVisibility::Invisible => {
                    let mut released = false;
                    if let Some(meshes) = node.detach_meshes() {
                        dispose_all(&meshes);
                        released = true;
                    }
                    released |= cache.evict(&guid);
                    // Octants never expanded this cycle may still be queued
                    pending.remove(&guid);
                    node.was_loaded = false;
                    if released {
                        summary.evicted += 1;
                    }
                }
                OctantVisibility::Renderable => {
                    let loaded = cache.get(&guid).ok_or(Error::MeshNotLoaded(guid))?;
                    let already_attached = node
                        .meshes
                        .as_ref()
                        .is_some_and(|meshes| Arc::ptr_eq(meshes, &loaded.meshes));
                    if !already_attached {
                        node.attach_meshes(loaded.meshes);
                        summary.attached += 1;
                    }
                    node.was_loaded = true;
                    node.point_count = loaded.point_count;
                }
                OctantVisibility::Awaiting => {
                    summary.awaiting += 1;
                }
            }

            stack.extend(octree[id].child_ids());
        }

        self.reconciliations += 1;
        log::debug!(
            "Reconciled scene: {} renderable, {} attached, {} evicted, {} awaiting",
            self.render_set.len(),
            summary.attached,
            summary.evicted,
            summary.awaiting
        );
        Ok(summary)
    }

    /// Visible octants with geometry, as of the last reconciliation
    pub fn render_set(&self) -> &HashSet<Uuid> {
        &self.render_set
    }

    /// Number of reconciliations performed
    pub fn reconciliations(&self) -> u64 {
        self.reconciliations
    }

    pub fn interval(&self) -> Duration {
        self.timer.interval()
    }

    /// Forget the render set and restart the throttle
    pub fn clear(&mut self) {
        self.render_set.clear();
        self.timer.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;
    use crate::points::PointMesh;
    use crate::streaming::cache::LoadedOctant;
    use crate::streaming::pending::PendingOctant;

    fn tree() -> (Octree<PointMesh>, OctantId, OctantId) {
        let mut octree = Octree::new(Uuid::from_u128(1), Vec3::ZERO, 4.0);
        let root = octree.root();
        let a = octree.add_child(root, 0, Uuid::from_u128(2)).unwrap();
        let b = octree.add_child(root, 7, Uuid::from_u128(3)).unwrap();
        (octree, a, b)
    }

    fn loaded(points: u32) -> LoadedOctant<PointMesh> {
        LoadedOctant::new(vec![PointMesh::new(vec![Vec3::ONE; points as usize])], points)
    }

    fn visible_of(octree: &Octree<PointMesh>, ids: &[OctantId]) -> HashMap<Uuid, OctantId> {
        ids.iter().map(|id| (octree[*id].guid, *id)).collect()
    }

    #[test]
    fn test_classify() {
        let guid = Uuid::from_u128(9);
        assert_eq!(OctantVisibility::classify(guid, false, false).unwrap(), OctantVisibility::Invisible);
        assert_eq!(OctantVisibility::classify(guid, true, true).unwrap(), OctantVisibility::Renderable);
        assert_eq!(OctantVisibility::classify(guid, true, false).unwrap(), OctantVisibility::Awaiting);
        assert!(matches!(
            OctantVisibility::classify(guid, false, true),
            Err(Error::InconsistentVisibility(g)) if g == guid
        ));
    }

    #[test]
    fn test_throttle_skips_while_moving() {
        let mut updater = SceneUpdater::new(Duration::from_millis(200));
        assert!(!updater.tick(Duration::from_millis(150), false));
        // Interval elapses while moving: skipped and restarted
        assert!(!updater.tick(Duration::from_millis(60), true));
        assert!(!updater.tick(Duration::from_millis(150), false));
        assert!(updater.tick(Duration::from_millis(60), false));
    }

    #[test]
    fn test_attach_renderable_and_leave_awaiting() {
        let (mut octree, a, b) = tree();
        let root = octree.root();
        let pending = PendingSet::new();
        let cache = LoadedMeshCache::new();
        cache.insert(octree[root].guid, loaded(4));
        cache.insert(octree[a].guid, loaded(2));
        pending.insert(octree[b].guid, PendingOctant::queued(b, 1.0, 8));

        let visible = visible_of(&octree, &[root, a, b]);
        let mut updater = SceneUpdater::new(Duration::from_millis(200));
        let summary = updater.reconcile(&mut octree, &visible, &pending, &cache).unwrap();

        assert_eq!(summary, ReconcileSummary { attached: 2, evicted: 0, awaiting: 1 });
        assert_eq!(updater.render_set().len(), 2);
        assert!(!updater.render_set().contains(&octree[b].guid));
        assert!(octree[a].has_meshes());
        assert!(octree[a].was_loaded);
        assert_eq!(octree[a].point_count, 2);
        assert!(!octree[b].has_meshes());
        assert!(!octree[b].was_loaded);

        // Every render-set octant has a cache entry
        for guid in updater.render_set() {
            assert!(cache.contains(guid));
        }

        // Re-running does not re-attach the same geometry
        let summary = updater.reconcile(&mut octree, &visible, &pending, &cache).unwrap();
        assert_eq!(summary.attached, 0);
        assert_eq!(updater.reconciliations(), 2);
    }

    #[test]
    fn test_evicts_octants_that_left_visibility() {
        let (mut octree, a, b) = tree();
        let root = octree.root();
        let pending = PendingSet::new();
        let cache = LoadedMeshCache::new();
        cache.insert(octree[root].guid, loaded(1));
        cache.insert(octree[a].guid, loaded(1));
        cache.insert(octree[b].guid, loaded(1));

        let mut updater = SceneUpdater::new(Duration::from_millis(200));
        let visible = visible_of(&octree, &[root, a, b]);
        updater.reconcile(&mut octree, &visible, &pending, &cache).unwrap();
        let meshes_a = octree[a].meshes.clone().unwrap();
        octree[a].visible_child_indices = 0b1;

        // `a` leaves visibility
        let visible = visible_of(&octree, &[root, b]);
        let summary = updater.reconcile(&mut octree, &visible, &pending, &cache).unwrap();

        assert_eq!(summary.evicted, 1);
        assert!(!octree[a].has_meshes());
        assert!(!octree[a].was_loaded);
        assert_eq!(octree[a].visible_child_indices, 0);
        assert!(!cache.contains(&octree[a].guid));
        assert!(meshes_a[0].is_disposed());
        assert!(octree[b].has_meshes());
    }

    #[test]
    fn test_invisible_octants_leave_pending_set() {
        let (mut octree, a, _) = tree();
        let root = octree.root();
        let pending = PendingSet::new();
        let cache = LoadedMeshCache::new();
        cache.insert(octree[root].guid, loaded(1));
        pending.insert(octree[a].guid, PendingOctant::queued(a, 1.0, 8));

        let visible = visible_of(&octree, &[root]);
        let mut updater = SceneUpdater::new(Duration::from_millis(200));
        updater.reconcile(&mut octree, &visible, &pending, &cache).unwrap();
        assert!(pending.is_empty());
    }

    #[test]
    fn test_missing_cache_entry_is_an_error() {
        let (mut octree, _, _) = tree();
        let root = octree.root();
        let pending = PendingSet::new();
        let cache = LoadedMeshCache::new();

        let visible = visible_of(&octree, &[root]);
        let mut updater = SceneUpdater::new(Duration::from_millis(200));
        let result = updater.reconcile(&mut octree, &visible, &pending, &cache);
        assert!(matches!(result, Err(Error::MeshNotLoaded(g)) if g == Uuid::from_u128(1)));
    }
}
