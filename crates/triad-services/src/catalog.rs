//! File catalog — the coordinator's in-memory set of retrievable names.
//!
//! Membership is advisory: a name is inserted before its parts are fully
//! distributed, so a crash or node failure mid-send can leave an entry
//! whose parts are incomplete. Nothing repairs that state automatically.
//! The catalog is not persisted; a coordinator restart starts empty.

use std::sync::Arc;

use dashmap::DashSet;

/// Cloneable handle to the shared name set. Constructed once in `main`
/// and injected into the coordinator; every connection handler mutates
/// it concurrently, which `DashSet` makes safe.
#[derive(Clone, Default)]
pub struct Catalog {
    names: Arc<DashSet<String>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a name. Returns false if it was already present; membership
    /// is idempotent, content replacement happens at the blob level.
    pub fn insert(&self, name: &str) -> bool {
        self.names.insert(name.to_string())
    }

    /// Remove a name. Returns false if it was not present.
    pub fn remove(&self, name: &str) -> bool {
        self.names.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Snapshot of all names. Iteration order is not stable across calls.
    pub fn names(&self) -> Vec<String> {
        self.names.iter().map(|n| n.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
