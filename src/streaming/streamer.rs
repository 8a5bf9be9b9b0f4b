//! Out-of-core octree streamer
//!
//! Owns the octree, the classifier, the updater and the background loader,
//! and exposes the per-frame `update_scene` entry point.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::core::camera::RenderView;
use crate::core::types::{Result, Uuid};
use crate::octree::{OctantId, Octree};
use crate::points::{point_mesh_factory, HasPosition, MeshFactory, OctantMesh, PointAccessor, PointMesh};
use crate::render::effect::{EffectParam, PointSizeMode, ShaderEffect};
use crate::render::hierarchy::{HierarchyTexture, OCTREE_TEX_PARAM};
use crate::scene::overlay::{OverlayNode, OverlayScene, WIREFRAME_CUBE_NAME};
use crate::streaming::cache::{dispose_all, LoadedMeshCache};
use crate::streaming::config::StreamingConfig;
use crate::streaming::disk_io::OctantStore;
use crate::streaming::loader::{LoaderContext, LoaderStats, LoaderStatsSnapshot, StreamingLoader};
use crate::streaming::pending::PendingSet;
use crate::streaming::updater::SceneUpdater;
use crate::streaming::visibility::VisibilityClassifier;

/// Streams an octree of point-cloud octants from disk under a point budget
pub struct OctreeStreamer<A: PointAccessor, M: OctantMesh> {
    config: StreamingConfig,
    octree: Octree<M>,
    store: OctantStore,
    view: RenderView,
    user_moving: bool,

    classifier: VisibilityClassifier,
    updater: SceneUpdater,
    texture: HierarchyTexture,

    pending: Arc<PendingSet>,
    cache: Arc<LoadedMeshCache<M>>,
    loader: StreamingLoader,

    was_scene_updated: bool,
    _accessor: std::marker::PhantomData<fn() -> A>,
}

impl<A: PointAccessor, M: OctantMesh> OctreeStreamer<A, M> {
    /// Create a streamer and start its loader thread
    pub fn new(
        config: StreamingConfig,
        octree: Octree<M>,
        accessor: A,
        factory: MeshFactory<A, M>,
    ) -> Result<Self> {
        config.validate()?;

        let store = OctantStore::new(config.data_dir.clone());
        let pending = Arc::new(PendingSet::new());
        let cache = Arc::new(LoadedMeshCache::new());

        let loader = StreamingLoader::spawn(LoaderContext {
            store: store.clone(),
            accessor: Arc::new(accessor),
            factory,
            pending: Arc::clone(&pending),
            cache: Arc::clone(&cache),
            stats: Arc::new(LoaderStats::default()),
            batch_size: config.load_batch_size,
        })?;

        log::info!(
            "Streaming {} octants from {} (threshold {} points)",
            octree.len(),
            store.data_dir().display(),
            config.point_threshold
        );

        Ok(Self {
            classifier: VisibilityClassifier::new(
                config.point_threshold,
                config.min_projected_size_ratio,
            ),
            updater: SceneUpdater::new(config.update_interval()),
            texture: HierarchyTexture::new(config.hierarchy_texture_width),
            config,
            octree,
            store,
            view: RenderView::default(),
            user_moving: false,
            pending,
            cache,
            loader,
            was_scene_updated: false,
            _accessor: std::marker::PhantomData,
        })
    }

    /// Per-frame entry point.
    ///
    /// Reconciles at most once per update interval and never while the user
    /// is moving. Returns whether a reconciliation ran.
    pub fn update_scene(
        &mut self,
        delta: Duration,
        point_size_mode: PointSizeMode,
        depth_effect: &mut dyn ShaderEffect,
        color_effect: &mut dyn ShaderEffect,
    ) -> Result<bool> {
        self.was_scene_updated = false;

        if !self.updater.tick(delta, self.user_moving) {
            return Ok(false);
        }

        self.reconcile(point_size_mode, depth_effect, color_effect)?;
        Ok(true)
    }

    /// Run one reconciliation immediately, bypassing the throttle
    pub fn reconcile(
        &mut self,
        point_size_mode: PointSizeMode,
        depth_effect: &mut dyn ShaderEffect,
        color_effect: &mut dyn ShaderEffect,
    ) -> Result<()> {
        self.classifier.traverse(
            &mut self.octree,
            &self.view,
            &self.store,
            &self.pending,
            &self.cache,
        );
        if self.pending.queued_count() > 0 {
            self.loader.notify();
        }

        self.updater.reconcile(
            &mut self.octree,
            self.classifier.visible_set(),
            &self.pending,
            &self.cache,
        )?;

        if point_size_mode == PointSizeMode::AdaptiveSize {
            self.texture.encode(&mut self.octree, self.updater.render_set());
            let image = Arc::clone(self.texture.image());
            depth_effect.set_effect_param(OCTREE_TEX_PARAM, EffectParam::Texture(Arc::clone(&image)));
            color_effect.set_effect_param(OCTREE_TEX_PARAM, EffectParam::Texture(image));
        }

        self.was_scene_updated = true;
        Ok(())
    }

    /// Add a wireframe cube per rendered octant. Returns the number added.
    pub fn show_octants(&self, scene: &mut OverlayScene) -> usize {
        self.delete_octants(scene);

        let before = scene.children.len();
        for guid in self.updater.render_set() {
            if !self.cache.contains(guid) {
                continue;
            }
            if let Some(id) = self.octree.find(guid) {
                let node = &self.octree[id];
                scene.children.push(OverlayNode::wireframe_cube(node.center, node.size));
            }
        }
        scene.children.len() - before
    }

    /// Remove all octant wireframes
    pub fn delete_octants(&self, scene: &mut OverlayScene) -> usize {
        scene.remove_named(WIREFRAME_CUBE_NAME)
    }

    /// Swap in a new octree, dropping all streaming state of the old one.
    ///
    /// Both trees come out detached and unloaded, so either can be handed
    /// back later and streams from scratch.
    pub fn set_octree(&mut self, octree: Octree<M>) -> Octree<M> {
        self.pending.clear();
        self.cache.clear();
        self.classifier.clear();
        self.updater.clear();
        self.texture = HierarchyTexture::new(self.config.hierarchy_texture_width);
        log::info!("Octree replaced ({} octants)", octree.len());

        let mut old = std::mem::replace(&mut self.octree, octree);
        reset_octree(&mut old);
        reset_octree(&mut self.octree);
        old
    }

    pub fn octree(&self) -> &Octree<M> {
        &self.octree
    }

    pub fn octree_mut(&mut self) -> &mut Octree<M> {
        &mut self.octree
    }

    /// Camera state for the next reconciliation
    pub fn set_render_view(&mut self, view: RenderView) {
        self.view = view;
    }

    pub fn render_view(&self) -> &RenderView {
        &self.view
    }

    pub fn set_user_moving(&mut self, moving: bool) {
        self.user_moving = moving;
    }

    pub fn is_user_moving(&self) -> bool {
        self.user_moving
    }

    /// True if the last `update_scene` call reconciled the scene
    pub fn was_scene_updated(&self) -> bool {
        self.was_scene_updated
    }

    /// Points counted by the last traversal
    pub fn visible_point_count(&self) -> u64 {
        self.classifier.visible_point_count()
    }

    pub fn point_threshold(&self) -> u64 {
        self.classifier.point_threshold()
    }

    pub fn set_point_threshold(&mut self, threshold: u64) {
        self.config.point_threshold = threshold;
        self.classifier.set_point_threshold(threshold);
    }

    /// Octants that are visible and loaded
    pub fn render_set(&self) -> &HashSet<Uuid> {
        self.updater.render_set()
    }

    /// Octants found visible by the last traversal
    pub fn visible_set(&self) -> &HashMap<Uuid, OctantId> {
        self.classifier.visible_set()
    }

    /// Visible octants waiting for (or failed) loading
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Number of reconciliations performed so far
    pub fn reconciliations(&self) -> u64 {
        self.updater.reconciliations()
    }

    pub fn loader_stats(&self) -> LoaderStatsSnapshot {
        self.loader.stats()
    }

    pub fn hierarchy_texture(&self) -> &HierarchyTexture {
        &self.texture
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    pub fn store(&self) -> &OctantStore {
        &self.store
    }

    /// Stop the loader thread. Also happens on drop.
    pub fn shutdown(&mut self) {
        self.loader.shutdown();
    }
}

impl<A> OctreeStreamer<A, PointMesh>
where
    A: PointAccessor,
    A::Point: HasPosition + Sync,
{
    /// Streamer building [`PointMesh`]es of at most `config.max_points_per_mesh` points
    pub fn with_point_meshes(config: StreamingConfig, octree: Octree<PointMesh>, accessor: A) -> Result<Self> {
        let factory = point_mesh_factory::<A>(config.max_points_per_mesh);
        Self::new(config, octree, accessor, factory)
    }
}

fn reset_octree<M: OctantMesh>(octree: &mut Octree<M>) {
    for node in octree.iter_mut() {
        if let Some(meshes) = node.reset_streaming_state() {
            dispose_all(&meshes);
        }
    }
}
