//! In-memory versioned module cache.
//!
//! Each script owns a slot holding its version counter and an `ArcSwap`ed
//! history. Readers load the history pointer without locking; writers
//! publish a new history with a compare-and-swap loop (`rcu`), so exactly one
//! version is current at any instant.
//!
//! ```text
//! slots: DashMap<ScriptIdentity, Arc<Slot>>
//!                                   │
//!                       ┌───────────┴───────────┐
//!                       │ counter: AtomicU64    │  only grows
//!                       │ history: ArcSwap<..>  │  entries: [v2, v3, v4]
//!                       └───────────────────────┘           current ─┘
//! ```
//!
//! Rollback moves the current pointer inside the retained history; it never
//! recompiles and never decrements the counter.

mod entry;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use dashmap::DashMap;

use crate::core::{Instance, Module, ScriptIdentity};

pub use entry::VersionEntry;

/// Fewest versions kept per script: the current one and its predecessor.
pub const MIN_RETAIN: usize = 2;

/// Default number of versions kept per script.
pub const DEFAULT_RETAIN: usize = 4;

#[derive(Debug, Default)]
struct Slot {
    counter: AtomicU64,
    history: ArcSwap<History>,
}

#[derive(Debug, Clone, Default)]
struct History {
    /// Ascending by version.
    entries: Vec<Arc<VersionEntry>>,
    current: Option<usize>,
}

impl History {
    fn current(&self) -> Option<&Arc<VersionEntry>> {
        self.current.and_then(|i| self.entries.get(i))
    }

    /// Install `entry` as current. Entries newer than the current pointer
    /// (left over from a rollback) are discarded.
    fn install(&self, entry: Arc<VersionEntry>, retain: usize) -> Self {
        let keep = self.current.map_or(0, |i| i + 1);
        let mut entries: Vec<_> = self.entries[..keep]
            .iter()
            .filter(|e| e.version < entry.version)
            .cloned()
            .collect();
        entries.push(entry);

        let excess = entries.len().saturating_sub(retain);
        entries.drain(..excess);

        Self {
            current: Some(entries.len() - 1),
            entries,
        }
    }

    fn step_back(&self) -> Option<Self> {
        let current = self.current?.checked_sub(1)?;
        Some(Self {
            entries: self.entries.clone(),
            current: Some(current),
        })
    }

    fn pin(&self, version: u64) -> Option<Self> {
        let index = self.entries.iter().position(|e| e.version == version)?;
        Some(Self {
            entries: self.entries.clone(),
            current: Some(index),
        })
    }
}

/// Per-script history of compiled modules.
#[derive(Debug)]
pub struct VersionedCache {
    slots: DashMap<ScriptIdentity, Arc<Slot>>,
    retain: usize,
}

impl Default for VersionedCache {
    fn default() -> Self {
        Self::new(DEFAULT_RETAIN)
    }
}

impl VersionedCache {
    /// Keep up to `retain` versions per script (at least [`MIN_RETAIN`]).
    pub fn new(retain: usize) -> Self {
        Self {
            slots: DashMap::new(),
            retain: retain.max(MIN_RETAIN),
        }
    }

    pub fn retain(&self) -> usize {
        self.retain
    }

    fn slot(&self, id: &ScriptIdentity) -> Option<Arc<Slot>> {
        self.slots.get(id).map(|s| Arc::clone(&s))
    }

    /// Version number of the current entry.
    pub fn get_version(&self, id: &ScriptIdentity) -> Option<u64> {
        self.get_current(id).map(|e| e.version)
    }

    /// The current entry, if the script ever compiled.
    pub fn get_current(&self, id: &ScriptIdentity) -> Option<Arc<VersionEntry>> {
        let slot = self.slot(id)?;
        let history = slot.history.load();
        history.current().cloned()
    }

    /// Install `module` as the current version and return its number.
    ///
    /// With `explicit`, that number is used and the counter is raised to at
    /// least it; otherwise the next counter value is taken. Callers serialize
    /// installs per script; the orchestrator keeps one compile in flight.
    pub fn update_version(
        &self,
        id: &ScriptIdentity,
        module: Arc<Module>,
        instance: Option<Instance>,
        explicit: Option<u64>,
    ) -> u64 {
        let slot = Arc::clone(&self.slots.entry(id.clone()).or_default());

        let version = match explicit {
            Some(v) => {
                slot.counter.fetch_max(v, Ordering::SeqCst);
                v
            }
            None => slot.counter.fetch_add(1, Ordering::SeqCst) + 1,
        };

        let entry = Arc::new(VersionEntry::new(version, module, instance));
        slot.history
            .rcu(|history| history.install(Arc::clone(&entry), self.retain));

        version
    }

    /// Make the immediately previous retained version current.
    ///
    /// Returns `false` when nothing older is retained.
    pub fn rollback(&self, id: &ScriptIdentity) -> bool {
        let Some(slot) = self.slot(id) else {
            return false;
        };
        let before = slot.history.rcu(|history| {
            history
                .step_back()
                .map_or_else(|| Arc::clone(history), Arc::new)
        });
        before.current.is_some_and(|i| i > 0)
    }

    /// Make the retained entry with `version` current.
    ///
    /// Succeeds without change when it already is current.
    pub fn rollback_to(&self, id: &ScriptIdentity, version: u64) -> Option<Arc<VersionEntry>> {
        let slot = self.slot(id)?;
        let before = slot.history.rcu(|history| {
            history
                .pin(version)
                .map_or_else(|| Arc::clone(history), Arc::new)
        });
        before.entries.iter().find(|e| e.version == version).cloned()
    }

    /// Retained version numbers, oldest first.
    pub fn retained_versions(&self, id: &ScriptIdentity) -> Vec<u64> {
        self.slot(id)
            .map(|slot| slot.history.load().entries.iter().map(|e| e.version).collect())
            .unwrap_or_default()
    }

    /// Every script with a current version, sorted by path.
    pub fn identities(&self) -> Vec<ScriptIdentity> {
        let mut ids: Vec<_> = self
            .slots
            .iter()
            .filter(|slot| slot.history.load().current.is_some())
            .map(|slot| slot.key().clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
