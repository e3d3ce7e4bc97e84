// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dynamic-filter domains: predicate refinements produced during execution
//! (e.g. the build side of a hash join) and broadcast to other stages.
//!
//! Domains are versioned; consumers poll with their last-seen version and
//! receive only the refinements newer than it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version reported before any domain has been published.
pub const INITIAL_DYNAMIC_FILTERS_VERSION: u64 = 0;

/// Identifier of one dynamic filter within a query plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DynamicFilterId(pub String);

impl DynamicFilterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DynamicFilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DynamicFilterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Summary of the values a filtered column may still take.
///
/// The scalar representation is opaque to the coordinator; it carries whatever
/// the execution runtime produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Domain {
    /// No restriction derived (yet)
    All,
    /// Provably empty: no row can match
    None,
    /// Discrete set of admissible values
    Values { values: Vec<serde_json::Value> },
}

impl Domain {
    pub fn values(values: impl IntoIterator<Item = serde_json::Value>) -> Self {
        Domain::Values { values: values.into_iter().collect() }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Domain::All)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Domain::None)
    }
}

/// A set of domains together with the high-water version they were taken at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedDomains {
    pub version: u64,
    pub domains: IndexMap<DynamicFilterId, Domain>,
}

impl VersionedDomains {
    /// The empty set reported while no execution exists.
    pub fn initial() -> Self {
        Self { version: INITIAL_DYNAMIC_FILTERS_VERSION, domains: IndexMap::new() }
    }

    pub fn new(version: u64, domains: IndexMap<DynamicFilterId, Domain>) -> Self {
        Self { version, domains }
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Successor of a domain version. Saturates at the ceiling instead of
    /// wrapping.
    pub fn next_version(version: u64) -> u64 {
        version.saturating_add(1)
    }
}

impl Default for VersionedDomains {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
#[path = "domains_tests.rs"]
mod tests;
