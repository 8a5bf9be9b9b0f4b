//! Loaded-mesh cache
//!
//! Filled by the background loader, read and evicted by the scene updater.
//! Each entry also carries the octant's loaded point count so the loader
//! never has to touch octree nodes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::core::types::Uuid;
use crate::points::OctantMesh;

/// Geometry and point count of a loaded octant
#[derive(Debug)]
pub struct LoadedOctant<M> {
    pub meshes: Arc<[M]>,
    pub point_count: u32,
}

impl<M> LoadedOctant<M> {
    pub fn new(meshes: Vec<M>, point_count: u32) -> Self {
        Self {
            meshes: Arc::from(meshes),
            point_count,
        }
    }
}

impl<M> Clone for LoadedOctant<M> {
    fn clone(&self) -> Self {
        Self {
            meshes: Arc::clone(&self.meshes),
            point_count: self.point_count,
        }
    }
}

/// Concurrent map from octant GUID to loaded geometry
pub struct LoadedMeshCache<M> {
    entries: DashMap<Uuid, LoadedOctant<M>>,
    /// Points held by all cached octants
    resident_points: AtomicU64,
}

impl<M: OctantMesh> LoadedMeshCache<M> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            resident_points: AtomicU64::new(0),
        }
    }

    /// Insert a loaded octant.
    ///
    /// An existing entry wins; the duplicate meshes are disposed and `false`
    /// is returned.
    pub fn insert(&self, guid: Uuid, octant: LoadedOctant<M>) -> bool {
        match self.entries.entry(guid) {
            Entry::Occupied(_) => {
                log::trace!("Octant {} already cached, dropping duplicate", guid);
                dispose_all(&octant.meshes);
                false
            }
            Entry::Vacant(vacant) => {
                self.resident_points
                    .fetch_add(octant.point_count as u64, Ordering::Relaxed);
                vacant.insert(octant);
                true
            }
        }
    }

    /// Get a cached octant
    pub fn get(&self, guid: &Uuid) -> Option<LoadedOctant<M>> {
        self.entries.get(guid).map(|entry| entry.value().clone())
    }

    /// Point count of a cached octant
    pub fn point_count(&self, guid: &Uuid) -> Option<u32> {
        self.entries.get(guid).map(|entry| entry.point_count)
    }

    pub fn contains(&self, guid: &Uuid) -> bool {
        self.entries.contains_key(guid)
    }

    /// Remove an entry without disposing its meshes
    pub fn remove(&self, guid: &Uuid) -> Option<LoadedOctant<M>> {
        let (_, octant) = self.entries.remove(guid)?;
        self.resident_points
            .fetch_sub(octant.point_count as u64, Ordering::Relaxed);
        Some(octant)
    }

    /// Remove an entry and dispose its meshes
    pub fn evict(&self, guid: &Uuid) -> bool {
        match self.remove(guid) {
            Some(octant) => {
                dispose_all(&octant.meshes);
                true
            }
            None => false,
        }
    }

    /// Dispose and drop every entry
    pub fn clear(&self) {
        for guid in self.guids() {
            self.evict(&guid);
        }
    }

    pub fn guids(&self) -> Vec<Uuid> {
        self.entries.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total points across cached octants
    pub fn resident_points(&self) -> u64 {
        self.resident_points.load(Ordering::Relaxed)
    }
}

impl<M: OctantMesh> Default for LoadedMeshCache<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispose every mesh in a batch
pub fn dispose_all<M: OctantMesh>(meshes: &[M]) {
    for mesh in meshes {
        mesh.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;
    use crate::points::PointMesh;

    fn octant(points: u32) -> LoadedOctant<PointMesh> {
        LoadedOctant::new(vec![PointMesh::new(vec![Vec3::ZERO; points as usize])], points)
    }

    #[test]
    fn test_insert_and_get() {
        let cache = LoadedMeshCache::new();
        let guid = Uuid::new_v4();
        assert!(cache.insert(guid, octant(3)));

        let loaded = cache.get(&guid).unwrap();
        assert_eq!(loaded.point_count, 3);
        assert_eq!(loaded.meshes[0].positions.len(), 3);
        assert_eq!(cache.point_count(&guid), Some(3));
        assert_eq!(cache.resident_points(), 3);
    }

    #[test]
    fn test_existing_entry_wins() {
        let cache = LoadedMeshCache::new();
        let guid = Uuid::new_v4();
        cache.insert(guid, octant(3));

        let duplicate = octant(5);
        let duplicate_meshes = Arc::clone(&duplicate.meshes);
        assert!(!cache.insert(guid, duplicate));

        assert!(duplicate_meshes[0].is_disposed());
        assert_eq!(cache.point_count(&guid), Some(3));
        assert_eq!(cache.resident_points(), 3);
    }

    #[test]
    fn test_evict_disposes() {
        let cache = LoadedMeshCache::new();
        let guid = Uuid::new_v4();
        cache.insert(guid, octant(2));
        let meshes = cache.get(&guid).unwrap().meshes;

        assert!(cache.evict(&guid));
        assert!(meshes[0].is_disposed());
        assert!(!cache.contains(&guid));
        assert_eq!(cache.resident_points(), 0);
        assert!(!cache.evict(&guid));
    }

    #[test]
    fn test_remove_keeps_meshes_alive() {
        let cache = LoadedMeshCache::new();
        let guid = Uuid::new_v4();
        cache.insert(guid, octant(2));

        let removed = cache.remove(&guid).unwrap();
        assert!(!removed.meshes[0].is_disposed());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let cache = LoadedMeshCache::new();
        let guids: Vec<_> = (0..4).map(|_| Uuid::new_v4()).collect();
        for guid in &guids {
            cache.insert(*guid, octant(1));
        }
        let meshes = cache.get(&guids[0]).unwrap().meshes;

        cache.clear();
        assert!(cache.is_empty());
        assert!(meshes[0].is_disposed());
        assert_eq!(cache.resident_points(), 0);
    }
}
