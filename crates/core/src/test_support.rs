// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::domains::{Domain, DynamicFilterId, VersionedDomains};
use crate::plan::{PlanFragment, Split, SplitAssignment};
use crate::task::TaskId;
use indexmap::IndexMap;
use serde_json::json;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core lifecycle types.
pub mod strategies {
    use crate::domains::Domain;
    use crate::task::TaskState;
    use proptest::prelude::*;

    pub fn arb_task_state() -> impl Strategy<Value = TaskState> {
        prop_oneof![
            Just(TaskState::Planned),
            Just(TaskState::Running),
            Just(TaskState::Flushing),
            Just(TaskState::Finished),
            Just(TaskState::Canceled),
            Just(TaskState::Aborted),
            Just(TaskState::Failed),
        ]
    }

    pub fn arb_domain() -> impl Strategy<Value = Domain> {
        prop_oneof![
            Just(Domain::All),
            Just(Domain::None),
            proptest::collection::vec(any::<i64>(), 0..4).prop_map(|values| {
                Domain::values(values.into_iter().map(serde_json::Value::from))
            }),
        ]
    }
}

// ── Factory functions ───────────────────────────────────────────────────

pub fn test_task_id(partition: u32) -> TaskId {
    TaskId::new("test_query", 1, partition, 0)
}

pub fn test_fragment() -> PlanFragment {
    PlanFragment::new(1, json!({"root": {"scan": "test_table"}}))
}

pub fn test_assignment(plan_node: &str, split_count: u64) -> SplitAssignment {
    let splits =
        (0..split_count).map(|seq| Split::new(seq, json!({"part": seq}))).collect();
    SplitAssignment::new(plan_node, splits, false)
}

pub fn domains_at_version(version: u64, ids: &[&str]) -> VersionedDomains {
    let mut domains = IndexMap::new();
    for id in ids {
        domains.insert(DynamicFilterId::new(*id), Domain::values([json!(version)]));
    }
    VersionedDomains::new(version, domains)
}
