//! Liveness coordination between the host's reference-counted values and
//! the engine's traced heap.
//!
//! Every host value that ends up referenced from engine-side state is
//! registered here together with the rooted engine handles that depend on
//! it. The table holds one internal reference to each registered owner; a
//! collection-cycle hook prunes owners whose only remaining reference is
//! that internal one, destroying their rooted handles so the collector can
//! reclaim the engine side.

use hashbrown::HashMap;
use trestle_engine::{Heap, RootId};
use trestle_host::{messages, HostError, HostId, HostValue};

/// References a registered owner always has while in the table: the
/// table's own clone.
const INTERNAL_REFS: usize = 1;

struct OwnerEntry {
    owner: HostValue,
    roots: Vec<RootId>,
}

#[derive(Default)]
pub struct LivenessTable {
    entries: HashMap<HostId, OwnerEntry, ahash::RandomState>,
}

impl LivenessTable {
    pub fn new() -> Self {
        LivenessTable::default()
    }

    /// Record that `root` must stay alive for as long as `owner` has
    /// references outside this table. Repeated associations against the
    /// same owner accumulate.
    pub fn associate(&mut self, owner: &HostValue, root: RootId) -> Result<(), HostError> {
        let id = owner
            .identity()
            .ok_or_else(|| HostError::Type(messages::NO_IDENTITY.to_string()))?;
        self.entries
            .entry(id)
            .or_insert_with(|| OwnerEntry {
                owner: owner.clone(),
                roots: Vec::new(),
            })
            .roots
            .push(root);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: HostId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Collection-cycle pass: drop every owner whose reference count has
    /// fallen to the table-internal minimum, destroying rooted handles that
    /// no surviving owner still needs. One linear counting pass plus one
    /// linear prune; never re-scans the table per entry.
    ///
    /// Owners that regained references since registration are left alone,
    /// so a handle may survive longer than strictly necessary. It is never
    /// destroyed early.
    pub fn on_collection_cycle_begin(&mut self, heap: &mut Heap) {
        if self.entries.is_empty() {
            return;
        }

        let mut usage: HashMap<RootId, usize, ahash::RandomState> = HashMap::default();
        for entry in self.entries.values() {
            for root in &entry.roots {
                *usage.entry(*root).or_insert(0) += 1;
            }
        }

        let mut pruned = 0usize;
        let mut destroyed = 0usize;
        self.entries.retain(|_, entry| {
            let refs = entry.owner.ref_count().unwrap_or(0);
            if refs > INTERNAL_REFS {
                return true;
            }
            for root in &entry.roots {
                if let Some(count) = usage.get_mut(root) {
                    *count -= 1;
                    if *count == 0 {
                        heap.unroot(*root);
                        destroyed += 1;
                    }
                }
            }
            pruned += 1;
            false
        });

        if pruned > 0 {
            tracing::debug!(
                pruned,
                destroyed,
                remaining = self.entries.len(),
                "liveness prune pass"
            );
        }
    }

    /// Destroy every rooted handle and forget all owners. Used at context
    /// teardown.
    pub fn release_all(&mut self, heap: &mut Heap) {
        for entry in self.entries.values() {
            for root in &entry.roots {
                heap.unroot(*root);
            }
        }
        self.entries.clear();
    }
}
