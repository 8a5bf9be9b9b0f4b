//! Visible octree hierarchy texture for adaptive point sizes
//!
//! The render set is laid out breadth-first in a 1-D RGB texture, one texel
//! per octant:
//!
//! - red: bitmask of the octant's children that are in the render set
//! - green: offset in texels from the octant to its first visible child
//!
//! The shader walks this from the root to find the deepest visible octant
//! around a point and sizes the point accordingly.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use image::{Rgb, RgbImage};

use crate::core::types::Uuid;
use crate::octree::Octree;

/// Shader parameter name the texture is bound to
pub const OCTREE_TEX_PARAM: &str = "OctreeTex";

const CHILD_MASK_CHANNEL: usize = 0;
const CHILD_OFFSET_CHANNEL: usize = 1;

/// Fixed-size hierarchy texture, rewritten on every encode
#[derive(Clone, Debug)]
pub struct HierarchyTexture {
    image: Arc<RgbImage>,
}

impl HierarchyTexture {
    /// Create a cleared texture `width` texels wide
    pub fn new(width: u32) -> Self {
        Self {
            image: Arc::new(RgbImage::new(width.max(1), 1)),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image contents
    pub fn image(&self) -> &Arc<RgbImage> {
        &self.image
    }

    /// Texel at `slot`
    pub fn texel(&self, slot: u32) -> Option<[u8; 3]> {
        (slot < self.image.width()).then(|| self.image.get_pixel(slot, 0).0)
    }

    /// Re-encode the texture from the render set.
    ///
    /// Resets `visible_child_indices` on every octant and assigns
    /// `pos_in_hierarchy_tex` to octants in the render set. Returns the number
    /// of texels written.
    pub fn encode<M>(&mut self, octree: &mut Octree<M>, render_set: &HashSet<Uuid>) -> u32 {
        let width = self.image.width();
        let mut image = RgbImage::new(width, 1);

        for node in octree.iter_mut() {
            node.visible_child_indices = 0;
        }

        let root = octree.root();
        octree[root].pos_in_hierarchy_tex = 0;
        if !render_set.contains(&octree[root].guid) {
            self.image = Arc::new(image);
            return 0;
        }

        let mut candidates = VecDeque::from([root]);
        let mut slot = 0u32;
        let mut overflowed = false;

        while let Some(id) = candidates.pop_front() {
            if render_set.contains(&octree[id].guid) {
                octree[id].pos_in_hierarchy_tex = slot;

                let parent = octree[id].parent;
                if let Some(parent) = parent.filter(|p| render_set.contains(&octree[*p].guid)) {
                    let parent_slot = octree[parent].pos_in_hierarchy_tex;

                    if octree[parent].visible_child_indices == 0 {
                        let offset = slot - parent_slot;
                        let offset = u8::try_from(offset).unwrap_or_else(|_| {
                            log::warn!(
                                "Hierarchy texture child offset {} does not fit a byte, clamping",
                                offset
                            );
                            u8::MAX
                        });
                        set_channel(&mut image, parent_slot, CHILD_OFFSET_CHANNEL, offset);
                    }

                    let pos_in_parent = octree[id].pos_in_parent;
                    let mask = octree[parent].visible_child_indices | (1 << pos_in_parent);
                    octree[parent].visible_child_indices = mask;
                    set_channel(&mut image, parent_slot, CHILD_MASK_CHANNEL, mask);
                }

                if slot >= width && !overflowed {
                    log::warn!(
                        "Render set exceeds hierarchy texture width {}, truncating",
                        width
                    );
                    overflowed = true;
                }
                slot += 1;
            }

            candidates.extend(octree[id].child_ids());
        }

        self.image = Arc::new(image);
        slot.min(width)
    }
}

fn set_channel(image: &mut RgbImage, slot: u32, channel: usize, value: u8) {
    if slot < image.width() {
        let Rgb(texel) = image.get_pixel_mut(slot, 0);
        texel[channel] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;
    use crate::octree::OctantId;

    struct Fixture {
        tree: Octree<()>,
        child1: OctantId,
        child3: OctantId,
        grandchild: OctantId,
        child5: OctantId,
    }

    fn fixture() -> Fixture {
        let mut tree = Octree::new(Uuid::new_v4(), Vec3::ZERO, 16.0);
        let root = tree.root();
        let child1 = tree.add_child(root, 1, Uuid::new_v4()).unwrap();
        let child3 = tree.add_child(root, 3, Uuid::new_v4()).unwrap();
        let child5 = tree.add_child(root, 5, Uuid::new_v4()).unwrap();
        let grandchild = tree.add_child(child1, 0, Uuid::new_v4()).unwrap();
        Fixture { tree, child1, child3, grandchild, child5 }
    }

    fn guids(tree: &Octree<()>, ids: &[OctantId]) -> HashSet<Uuid> {
        ids.iter().map(|id| tree[*id].guid).collect()
    }

    #[test]
    fn test_encode_breadth_first() {
        let Fixture { mut tree, child1, child3, grandchild, .. } = fixture();
        let root = tree.root();
        let render_set = guids(&tree, &[root, child1, child3, grandchild]);

        let mut tex = HierarchyTexture::new(16);
        assert_eq!(tex.encode(&mut tree, &render_set), 4);

        assert_eq!(tree[root].pos_in_hierarchy_tex, 0);
        assert_eq!(tree[child1].pos_in_hierarchy_tex, 1);
        assert_eq!(tree[child3].pos_in_hierarchy_tex, 2);
        assert_eq!(tree[grandchild].pos_in_hierarchy_tex, 3);

        // Root: children 1 and 3 visible, first one a single texel away
        assert_eq!(tex.texel(0), Some([0b0000_1010, 1, 0]));
        // Child 1: child 0 visible, two texels away
        assert_eq!(tex.texel(1), Some([0b0000_0001, 2, 0]));
        assert_eq!(tex.texel(2), Some([0, 0, 0]));
        assert_eq!(tex.texel(3), Some([0, 0, 0]));
        assert_eq!(tree[root].visible_child_indices, 0b0000_1010);
    }

    #[test]
    fn test_encode_clears_previous_contents() {
        let Fixture { mut tree, child1, child5, .. } = fixture();
        let root = tree.root();

        let mut tex = HierarchyTexture::new(8);
        let three = guids(&tree, &[root, child1, child5]);
        tex.encode(&mut tree, &three);
        assert_eq!(tex.texel(0), Some([0b0010_0010, 1, 0]));

        let root_only = guids(&tree, &[root]);
        tex.encode(&mut tree, &root_only);
        assert_eq!(tex.texel(0), Some([0, 0, 0]));
        assert_eq!(tex.width(), 8);
        assert_eq!(tree[root].visible_child_indices, 0);
    }

    #[test]
    fn test_root_outside_render_set_writes_nothing() {
        let Fixture { mut tree, child1, .. } = fixture();
        let mut tex = HierarchyTexture::new(8);
        let render_set = guids(&tree, &[child1]);

        assert_eq!(tex.encode(&mut tree, &render_set), 0);
        assert!(tex.image().pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_hidden_parent_breaks_chain() {
        let Fixture { mut tree, child3, grandchild, .. } = fixture();
        let root = tree.root();
        // child1 is not rendered, so its child gets a slot but no parent entry
        let render_set = guids(&tree, &[root, child3, grandchild]);

        let mut tex = HierarchyTexture::new(8);
        assert_eq!(tex.encode(&mut tree, &render_set), 3);
        assert_eq!(tree[grandchild].pos_in_hierarchy_tex, 2);
        assert_eq!(tex.texel(0), Some([0b0000_1000, 1, 0]));
    }

    #[test]
    fn test_far_child_offset_clamps_to_byte() {
        let mut tree: Octree<()> = Octree::new(Uuid::new_v4(), Vec3::ZERO, 64.0);
        let mut level = vec![tree.root()];
        for _ in 0..3 {
            let mut next = Vec::new();
            for parent in level {
                for index in 0..8 {
                    next.push(tree.add_child(parent, index, Uuid::new_v4()).unwrap());
                }
            }
            level = next;
        }
        assert_eq!(tree.len(), 585);
        let render_set: HashSet<Uuid> = tree.iter().map(|node| node.guid).collect();

        let mut tex = HierarchyTexture::new(1024);
        assert_eq!(tex.encode(&mut tree, &render_set), 585);

        // First grandchild sits at slot 9, its children start at 73
        assert_eq!(tex.texel(9), Some([0xFF, 64, 0]));
        // Last grandchild sits at slot 72, its children start at 577
        assert_eq!(tex.texel(72), Some([0xFF, u8::MAX, 0]));
        assert_eq!(tex.texel(584), Some([0, 0, 0]));
    }

    #[test]
    fn test_truncates_at_texture_width() {
        let Fixture { mut tree, child1, child3, child5, .. } = fixture();
        let root = tree.root();
        let render_set = guids(&tree, &[root, child1, child3, child5]);

        let mut tex = HierarchyTexture::new(2);
        assert_eq!(tex.encode(&mut tree, &render_set), 2);
        assert_eq!(tex.texel(0), Some([0b0010_1010, 1, 0]));
    }
}
