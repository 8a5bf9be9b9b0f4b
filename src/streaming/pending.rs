//! Visible-but-unloaded octants shared between the traversal and the loader
//!
//! The traversal inserts and removes entries on the caller's thread while the
//! loader claims and completes them on its own thread. Entries persist across
//! traversals until the octant is loaded or leaves visibility.

use std::cmp::Ordering;

use dashmap::DashMap;

use crate::core::types::Uuid;
use crate::octree::OctantId;

/// Status of a pending octant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingState {
    /// Waiting for the loader
    Queued,
    /// Claimed by the loader
    Loading,
    /// Load failed; not retried while the octant stays visible
    Failed,
}

/// A visible octant whose points are not in memory yet.
#[derive(Clone, Copy, Debug)]
pub struct PendingOctant {
    pub id: OctantId,
    /// Projected size from the most recent traversal
    pub priority: f64,
    /// Point count read from the file header
    pub point_estimate: u32,
    pub state: PendingState,
}

impl PendingOctant {
    pub fn queued(id: OctantId, priority: f64, point_estimate: u32) -> Self {
        Self {
            id,
            priority,
            point_estimate,
            state: PendingState::Queued,
        }
    }

    pub fn failed(id: OctantId, priority: f64) -> Self {
        Self {
            id,
            priority,
            point_estimate: 0,
            state: PendingState::Failed,
        }
    }
}

/// Concurrent set of visible-and-unloaded octants
#[derive(Debug, Default)]
pub struct PendingSet {
    entries: DashMap<Uuid, PendingOctant>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry, replacing any previous one.
    pub fn insert(&self, guid: Uuid, octant: PendingOctant) {
        self.entries.insert(guid, octant);
    }

    /// Update the priority of an existing entry and return its stored state.
    ///
    /// Returns `None` when the octant is not pending.
    pub fn refresh(&self, guid: &Uuid, priority: f64) -> Option<PendingOctant> {
        let mut entry = self.entries.get_mut(guid)?;
        entry.priority = priority;
        Some(*entry)
    }

    pub fn contains(&self, guid: &Uuid) -> bool {
        self.entries.contains_key(guid)
    }

    pub fn get(&self, guid: &Uuid) -> Option<PendingOctant> {
        self.entries.get(guid).map(|entry| *entry)
    }

    pub fn state(&self, guid: &Uuid) -> Option<PendingState> {
        self.entries.get(guid).map(|entry| entry.state)
    }

    pub fn is_failed(&self, guid: &Uuid) -> bool {
        self.state(guid) == Some(PendingState::Failed)
    }

    pub fn remove(&self, guid: &Uuid) -> Option<PendingOctant> {
        self.entries.remove(guid).map(|(_, octant)| octant)
    }

    /// Run `on_complete` and drop the entry as one step.
    ///
    /// The entry's shard stays locked throughout, so a concurrent `remove` or
    /// `clear` lands either before (and `on_complete` is skipped) or after.
    /// Returns whether the octant was still pending.
    pub fn complete(&self, guid: &Uuid, on_complete: impl FnOnce()) -> bool {
        self.entries
            .remove_if(guid, |_, _| {
                on_complete();
                true
            })
            .is_some()
    }

    /// Mark an entry as failed. No-op if it already left the set.
    pub fn mark_failed(&self, guid: &Uuid) {
        if let Some(mut entry) = self.entries.get_mut(guid) {
            entry.state = PendingState::Failed;
        }
    }

    /// Claim up to `max` queued octants, highest priority first.
    ///
    /// Claimed entries move to [`PendingState::Loading`] so a concurrent call
    /// never hands out the same octant twice.
    pub fn take_batch(&self, max: usize) -> Vec<(Uuid, PendingOctant)> {
        if max == 0 {
            return Vec::new();
        }

        // Snapshot first: no shard lock may be held while claiming
        let mut candidates: Vec<(Uuid, PendingOctant)> = self
            .entries
            .iter()
            .filter(|entry| entry.state == PendingState::Queued)
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        candidates.sort_by(|(guid_a, a), (guid_b, b)| compare_priority(*guid_a, a, *guid_b, b));

        let mut batch = Vec::with_capacity(max.min(candidates.len()));
        for (guid, _) in candidates {
            if batch.len() == max {
                break;
            }
            if let Some(mut entry) = self.entries.get_mut(&guid) {
                if entry.state == PendingState::Queued {
                    entry.state = PendingState::Loading;
                    batch.push((guid, *entry));
                }
            }
        }
        batch
    }

    /// Number of entries waiting for the loader
    pub fn queued_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.state == PendingState::Queued)
            .count()
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

    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Descending priority, GUID as tie-break
fn compare_priority(guid_a: Uuid, a: &PendingOctant, guid_b: Uuid, b: &PendingOctant) -> Ordering {
    b.priority
        .total_cmp(&a.priority)
        .then_with(|| guid_b.cmp(&guid_a))
}
