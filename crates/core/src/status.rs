// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned task snapshots served to long-poll clients.
//!
//! `TaskStatus` is the light snapshot polled at high frequency; `TaskInfo`
//! wraps it with the heavier buffer/split/stats detail.

use crate::buffers::BufferInfo;
use crate::plan::PlanNodeId;
use crate::task::{FailureInfo, TaskId, TaskState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// First version a task reports. Greater than zero so a client polling with
/// version 0 always sees the creation snapshot as news.
pub const STARTING_VERSION: u64 = 1;

/// Byte and row counters for the task's input and output sides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoStats {
    pub input_rows: u64,
    pub input_bytes: u64,
    pub output_rows: u64,
    pub output_bytes: u64,
    pub physical_written_bytes: u64,
}

crate::builder! {
    pub struct IoStatsBuilder => IoStats {
        set {
            input_rows: u64 = 0,
            input_bytes: u64 = 0,
            output_rows: u64 = 0,
            output_bytes: u64 = 0,
            physical_written_bytes: u64 = 0,
        }
    }
}

/// Light point-in-time snapshot of execution progress.
///
/// The version is sampled before any value, so a change racing the read is
/// picked up by the caller's next poll rather than lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_id: TaskId,
    /// Regenerated on every task creation; peers use it to detect a worker
    /// restart mid-query
    pub instance_id: String,
    pub version: u64,
    pub state: TaskState,
    pub queued_drivers: u32,
    pub running_drivers: u32,
    pub queued_split_weight: u64,
    pub running_split_weight: u64,
    pub physical_written_bytes: u64,
    pub user_memory_bytes: u64,
    pub peak_user_memory_bytes: u64,
    pub revocable_memory_bytes: u64,
    /// Times the memory context reclaimed under pressure
    pub memory_reclaims: u64,
    pub memory_reclaim_ms: u64,
    pub dynamic_filters_version: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureInfo>,
    pub output_buffer_overutilized: bool,
}

crate::builder! {
    pub struct TaskStatusBuilder => TaskStatus {
        into {
            instance_id: String = "instance-test",
        }
        set {
            task_id: TaskId = crate::task::TaskId::new("test_query", 0, 0, 0),
            version: u64 = STARTING_VERSION,
            state: TaskState = TaskState::Planned,
            queued_drivers: u32 = 0,
            running_drivers: u32 = 0,
            queued_split_weight: u64 = 0,
            running_split_weight: u64 = 0,
            physical_written_bytes: u64 = 0,
            user_memory_bytes: u64 = 0,
            peak_user_memory_bytes: u64 = 0,
            revocable_memory_bytes: u64 = 0,
            memory_reclaims: u64 = 0,
            memory_reclaim_ms: u64 = 0,
            dynamic_filters_version: u64 = 0,
            failures: Vec<FailureInfo> = Vec::new(),
            output_buffer_overutilized: bool = false,
        }
    }
}

/// Cumulative counters reported inside `TaskInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub created_at_ms: u64,
    pub queued_drivers: u32,
    pub running_drivers: u32,
    pub completed_drivers: u32,
    pub io: IoStats,
}

/// Full task snapshot: status plus buffer, split, and stats detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub status: TaskStatus,
    /// Last liveness moment observed by a supervisor; does not bump the version
    pub last_heartbeat_ms: u64,
    pub output_buffers: BufferInfo,
    /// Plan nodes whose split intake is complete
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub no_more_splits: BTreeSet<PlanNodeId>,
    pub stats: TaskStats,
    /// True until a plan fragment has been applied
    pub needs_plan: bool,
}

impl TaskInfo {
    pub fn state(&self) -> TaskState {
        self.status.state
    }

    pub fn version(&self) -> u64 {
        self.status.version
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
