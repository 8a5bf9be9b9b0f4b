//! Priority queue for octant traversal based on screen-projected size

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::types::Uuid;
use crate::octree::OctantId;

/// Priority information for an octant
#[derive(Clone, Copy, Debug)]
pub struct OctantPriority {
    pub id: OctantId,
    pub guid: Uuid,
    /// Screen-projected size in pixels. Higher = more important
    pub projected_size: f64,
}

impl OctantPriority {
    pub fn new(id: OctantId, guid: Uuid, projected_size: f64) -> Self {
        Self {
            id,
            guid,
            projected_size,
        }
    }
}

// Ordered by (projected size, guid) so equal sizes never collide
impl Eq for OctantPriority {}

impl PartialEq for OctantPriority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for OctantPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.projected_size
            .total_cmp(&other.projected_size)
            .then_with(|| self.guid.cmp(&other.guid))
    }
}

impl PartialOrd for OctantPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Max-heap of octants ordered by projected size
#[derive(Debug, Default)]
pub struct OctantPriorityQueue {
    heap: BinaryHeap<OctantPriority>,
}

impl OctantPriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all queued octants
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Add an octant to the queue
    pub fn push(&mut self, priority: OctantPriority) {
        self.heap.push(priority);
    }

    /// Get the octant with the largest projected size
    pub fn pop(&mut self) -> Option<OctantPriority> {
        self.heap.pop()
    }

    pub fn peek(&self) -> Option<&OctantPriority> {
        self.heap.peek()
    }

    /// Get the number of queued octants
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
