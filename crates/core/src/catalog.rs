// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide catalog registry.
//!
//! Unrelated to the task lifecycle; this is the shared name→catalog map the
//! worker process exposes to connectors. Registration is serialized to
//! enforce the uniqueness check; reads clone an atomically swapped snapshot
//! so lookups never hold the map open against writers.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A registered catalog: a named connector instance plus its configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub name: String,
    pub connector: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Catalog {
    pub fn new(name: impl Into<String>, connector: impl Into<String>) -> Self {
        Self { name: name.into(), connector: connector.into(), properties: BTreeMap::new() }
    }

    crate::setters! {
        set {
            properties: BTreeMap<String, String>,
        }
    }
}

/// Error registering a catalog.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog already registered: {0}")]
    AlreadyRegistered(String),
}

/// Concurrent name→catalog map.
#[derive(Default)]
pub struct CatalogRegistry {
    catalogs: RwLock<Arc<IndexMap<String, Arc<Catalog>>>>,
}

impl CatalogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a catalog under its name. Fails if the name is taken.
    pub fn register(&self, catalog: Catalog) -> Result<(), CatalogError> {
        let mut guard = self.catalogs.write();
        if guard.contains_key(&catalog.name) {
            return Err(CatalogError::AlreadyRegistered(catalog.name));
        }
        let mut next = IndexMap::clone(&guard);
        next.insert(catalog.name.clone(), Arc::new(catalog));
        *guard = Arc::new(next);
        Ok(())
    }

    /// Remove a catalog, returning its handle if it was present.
    pub fn remove(&self, name: &str) -> Option<Arc<Catalog>> {
        let mut guard = self.catalogs.write();
        if !guard.contains_key(name) {
            return None;
        }
        let mut next = IndexMap::clone(&guard);
        let removed = next.shift_remove(name);
        *guard = Arc::new(next);
        removed
    }

    pub fn get(&self, name: &str) -> Option<Arc<Catalog>> {
        self.snapshot().get(name).cloned()
    }

    /// Registration-ordered snapshot of the registered names.
    pub fn names(&self) -> Vec<String> {
        self.snapshot().keys().cloned().collect()
    }

    fn snapshot(&self) -> Arc<IndexMap<String, Arc<Catalog>>> {
        Arc::clone(&self.catalogs.read())
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
