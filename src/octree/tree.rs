//! Arena-backed octree of point-cloud octants

use std::collections::HashMap;

use crate::core::error::Error;
use crate::core::types::{Result, Uuid, Vec3};

use super::node::{OctantId, OctantNode};

/// Octree of point-cloud octants.
///
/// The structure is built once (typically from a converter's hierarchy file)
/// and never shrinks during a streaming session; only per-node streaming state
/// changes.
#[derive(Debug)]
pub struct Octree<M> {
    nodes: Vec<OctantNode<M>>,
    by_guid: HashMap<Uuid, OctantId>,
}

impl<M> Octree<M> {
    /// Create an octree with a single root octant.
    pub fn new(root_guid: Uuid, center: Vec3, size: f32) -> Self {
        let root = OctantNode::new(OctantId(0), root_guid, center, size);
        let mut by_guid = HashMap::new();
        by_guid.insert(root_guid, root.id);
        Self {
            nodes: vec![root],
            by_guid,
        }
    }

    /// Root octant ID
    pub fn root(&self) -> OctantId {
        OctantId(0)
    }

    /// Add a child octant at `index` (0-7) of `parent`.
    ///
    /// The child's bounds are the corresponding octant of the parent cube.
    pub fn add_child(&mut self, parent: OctantId, index: u8, guid: Uuid) -> Result<OctantId> {
        if index > 7 {
            return Err(Error::Octree(format!("child index {} out of range", index)));
        }
        if self.by_guid.contains_key(&guid) {
            return Err(Error::Octree(format!("duplicate octant guid {}", guid)));
        }
        let parent_node = self
            .get(parent)
            .ok_or_else(|| Error::Octree(format!("unknown parent octant {:?}", parent)))?;
        if parent_node.children[index as usize].is_some() {
            return Err(Error::Octree(format!(
                "octant {} already has a child at index {}",
                parent_node.guid, index
            )));
        }

        let center = parent_node.aabb().octant_center(index);
        let size = parent_node.size * 0.5;
        let id = OctantId(self.nodes.len() as u32);

        let mut node = OctantNode::new(id, guid, center, size);
        node.parent = Some(parent);
        node.pos_in_parent = index;
        self.nodes.push(node);
        self.by_guid.insert(guid, id);

        let parent_node = &mut self.nodes[parent.index()];
        parent_node.children[index as usize] = Some(id);
        parent_node.is_leaf = false;

        Ok(id)
    }

    /// Get an immutable reference to an octant.
    pub fn get(&self, id: OctantId) -> Option<&OctantNode<M>> {
        self.nodes.get(id.index())
    }

    /// Get a mutable reference to an octant.
    pub fn get_mut(&mut self, id: OctantId) -> Option<&mut OctantNode<M>> {
        self.nodes.get_mut(id.index())
    }

    /// Look up an octant by GUID.
    pub fn find(&self, guid: &Uuid) -> Option<OctantId> {
        self.by_guid.get(guid).copied()
    }

    /// Present children of an octant, in octant order.
    pub fn children(&self, id: OctantId) -> [Option<OctantId>; 8] {
        self.get(id).map(|n| n.children).unwrap_or([None; 8])
    }

    /// Iterate over all octants.
    pub fn iter(&self) -> impl Iterator<Item = &OctantNode<M>> {
        self.nodes.iter()
    }

    /// Iterate mutably over all octants.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut OctantNode<M>> {
        self.nodes.iter_mut()
    }

    /// Total number of octants.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<M> std::ops::Index<OctantId> for Octree<M> {
    type Output = OctantNode<M>;

    fn index(&self, id: OctantId) -> &Self::Output {
        &self.nodes[id.index()]
    }
}

impl<M> std::ops::IndexMut<OctantId> for Octree<M> {
    fn index_mut(&mut self, id: OctantId) -> &mut Self::Output {
        &mut self.nodes[id.index()]
    }
}
