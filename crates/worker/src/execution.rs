// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contracts consumed from the operator runtime and the output subsystem.
//!
//! The coordinator never executes a pipeline or buffers a page itself; it
//! drives these traits at well-defined lifecycle points. Implementations live
//! outside this crate (the operator runtime, the exchange subsystem); the
//! stub implementations used by tests live in `test_support`.

use crate::error::TaskError;
use crate::state_machine::TaskStateMachine;
use async_trait::async_trait;
use quern_core::{
    BufferInfo, BufferLimits, BufferResult, IoStats, OutputBufferId, OutputBufferSpec,
    PlanFragment, PlanNodeId, SplitAssignment, TaskId, TaskSession, VersionedDomains,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Callback fired whenever a collaborator changes something a long-poll
/// client can observe (buffered pages, execution progress).
pub type StatusNotifier = Arc<dyn Fn() + Send + Sync>;

/// Per-pipeline progress counters summed into `TaskStatus`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub queued_drivers: u32,
    pub running_drivers: u32,
    pub completed_drivers: u32,
    pub queued_split_weight: u64,
    pub running_split_weight: u64,
    pub physical_written_bytes: u64,
}

/// Counters read from the execution's memory context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextStats {
    pub user_memory_bytes: u64,
    pub peak_user_memory_bytes: u64,
    pub revocable_memory_bytes: u64,
    pub memory_reclaims: u64,
    pub memory_reclaim_ms: u64,
}

/// A running stage instance: the operator runtime's side of one task.
pub trait TaskExecution: Send + Sync {
    /// Deliver split batches. Redelivered splits must be deduplicated by the
    /// implementation (the coordinator node retries updates).
    fn add_split_assignments(&self, assignments: Vec<SplitAssignment>) -> Result<(), TaskError>;

    /// Forward predicate domains produced by other stages for this task's
    /// consumers.
    fn update_dynamic_filter_domains(&self, domains: VersionedDomains) -> Result<(), TaskError>;

    /// Plan nodes whose split intake is complete.
    fn no_more_splits(&self) -> BTreeSet<PlanNodeId>;

    fn pipeline_status(&self) -> Vec<PipelineStatus>;

    fn context_stats(&self) -> ContextStats;

    fn io_stats(&self) -> IoStats;

    /// High-water version of the domains this task has produced.
    fn dynamic_filter_version(&self) -> u64;

    /// Return the domains newer than `callers_version` together with the new
    /// high-water version.
    fn acknowledge_and_get_new_dynamic_filter_domains(
        &self,
        callers_version: u64,
    ) -> VersionedDomains;
}

/// Builds the execution when the first plan fragment arrives.
///
/// The factory closes over whatever the runtime needs beyond the task itself
/// (query-level memory context, spill configuration); the coordinator hands
/// it only task-scoped wiring.
pub trait ExecutionFactory: Send + Sync {
    fn create(
        &self,
        session: &TaskSession,
        state_machine: Arc<TaskStateMachine>,
        buffer: Arc<dyn OutputBuffer>,
        fragment: PlanFragment,
        status_notifier: StatusNotifier,
    ) -> Result<Arc<dyn TaskExecution>, TaskError>;
}

/// Producer-side queue of result pages fetched by downstream tasks.
///
/// The buffer has its own concurrency discipline; the coordinator only calls
/// these lifecycle points.
#[async_trait]
pub trait OutputBuffer: Send + Sync {
    /// Apply a (possibly stale) buffer descriptor. Stale versions are ignored.
    fn set_output_buffer_spec(&self, spec: OutputBufferSpec) -> Result<(), TaskError>;

    /// Fetch pages for one consumer starting at `starting_sequence`, bounded
    /// by `max_size_bytes`. May stay pending until pages arrive or the buffer
    /// reaches a terminal state.
    async fn get(
        &self,
        buffer: OutputBufferId,
        starting_sequence: u64,
        max_size_bytes: u64,
    ) -> Result<BufferResult, TaskError>;

    /// Discard pages below `sequence` for one consumer.
    fn acknowledge(&self, buffer: OutputBufferId, sequence: u64);

    /// One downstream consumer is gone; drop its buffer.
    fn destroy_buffer(&self, buffer: OutputBufferId);

    /// Clean teardown: the task finished or was canceled, drain and release.
    fn destroy(&self);

    /// Failure teardown: make upstream producers see the error.
    fn abort(&self);

    fn info(&self) -> BufferInfo;

    fn is_overutilized(&self) -> bool;
}

/// Builds the task's output buffer at task creation.
///
/// Implementations close over the exchange plumbing (spooling, encryption);
/// the coordinator passes only the task identity, its byte limits, and the
/// notifier the buffer must fire on every observable change.
pub trait OutputBufferFactory: Send + Sync {
    fn create(
        &self,
        task_id: &TaskId,
        limits: BufferLimits,
        on_change: StatusNotifier,
    ) -> Arc<dyn OutputBuffer>;
}
