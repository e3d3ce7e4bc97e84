// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan fragments and split assignments as the coordinator sees them.
//!
//! Plan internals belong to the operator runtime; the coordinator treats the
//! fragment body and split payloads as opaque blobs it only routes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node within a plan fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanNodeId(pub String);

impl PlanNodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlanNodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Portion of the physical plan dispatched to this task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFragment {
    pub id: u32,
    /// Serialized fragment body, decoded by the execution factory
    pub body: serde_json::Value,
}

impl PlanFragment {
    pub fn new(id: u32, body: serde_json::Value) -> Self {
        Self { id, body }
    }
}

/// Unit of input data delivered to a task after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    /// Per-task sequence number assigned by the coordinator node; used to
    /// deduplicate redelivered splits
    pub sequence_id: u64,
    /// Connector-specific split payload
    pub payload: serde_json::Value,
}

impl Split {
    pub fn new(sequence_id: u64, payload: serde_json::Value) -> Self {
        Self { sequence_id, payload }
    }
}

/// Batch of splits for one plan node, plus the no-more-splits marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitAssignment {
    pub plan_node: PlanNodeId,
    pub splits: Vec<Split>,
    /// True when the coordinator node will never send another split for this
    /// plan node
    pub no_more_splits: bool,
}

impl SplitAssignment {
    pub fn new(plan_node: impl Into<PlanNodeId>, splits: Vec<Split>, no_more_splits: bool) -> Self {
        Self { plan_node: plan_node.into(), splits, no_more_splits }
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
