// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-task coordinator.
//!
//! `WorkerTask` owns the state machine, version beacon, holder, and heartbeat
//! for one task, and brokers every control command between the coordinator
//! node, the operator runtime, the output buffer, and downstream fetchers.
//! It owns no thread: all methods complete synchronously except the three
//! documented long-poll futures.

use crate::beacon::VersionBeacon;
use crate::error::TaskError;
use crate::execution::{
    ContextStats, ExecutionFactory, OutputBuffer, OutputBufferFactory, PipelineStatus,
    StatusNotifier,
};
use crate::holder::{FinalSnapshot, TaskHolder};
use crate::metrics::CounterStat;
use crate::state_machine::TaskStateMachine;
use parking_lot::Mutex;
use quern_core::{
    BufferLimits, BufferResult, Clock, FailureInfo, OutputBufferId, OutputBufferSpec,
    PlanFragment, SplitAssignment, TaskId, TaskInfo, TaskSession, TaskState, TaskStats,
    TaskStatus, VersionedDomains, INITIAL_DYNAMIC_FILTERS_VERSION, STARTING_VERSION,
};
use std::sync::Arc;
use tokio::runtime::Handle;
use uuid::Uuid;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Owner callback fired once, after the task reached a terminal state and
/// its resources were released. A returned error is logged, never propagated.
pub type DoneCallback = Box<dyn Fn(&TaskInfo) -> Result<(), BoxError> + Send + Sync>;

/// Everything a task needs injected at creation.
pub struct TaskWiring<C: Clock> {
    pub clock: C,
    pub exec_factory: Arc<dyn ExecutionFactory>,
    pub buffer_factory: Arc<dyn OutputBufferFactory>,
    pub buffer_limits: BufferLimits,
    /// Notification executor for listener dispatch
    pub notifier: Handle,
    pub on_done: DoneCallback,
    pub failed_tasks: CounterStat,
}

pub struct WorkerTask<C: Clock> {
    task_id: TaskId,
    /// Regenerated per creation; peers detect a worker restart through it
    instance_id: String,
    location: String,
    node_id: String,
    clock: C,
    state_machine: Arc<TaskStateMachine>,
    beacon: Arc<VersionBeacon>,
    /// Bump-the-beacon closure handed to the buffer and the execution
    status_notifier: StatusNotifier,
    holder: TaskHolder,
    buffer: Arc<dyn OutputBuffer>,
    exec_factory: Arc<dyn ExecutionFactory>,
    /// Coordinator critical section: holder installs and execution creation
    update_lock: Mutex<()>,
    trace_token: Mutex<Option<String>>,
    last_heartbeat_ms: Mutex<u64>,
    /// Taken exactly once by the terminal listener
    on_done: Mutex<Option<DoneCallback>>,
    failed_tasks: CounterStat,
}

impl<C: Clock + 'static> WorkerTask<C> {
    /// Build a task in `Planned` state with an `Empty` holder at
    /// `STARTING_VERSION`, then wire its terminal listener.
    ///
    /// Listener registration happens after the `Arc` exists; nothing leaks
    /// out of the constructor, and the listener holds only a weak
    /// back-reference so it cannot pin the task.
    pub fn create(
        task_id: TaskId,
        location: impl Into<String>,
        node_id: impl Into<String>,
        wiring: TaskWiring<C>,
    ) -> Arc<Self> {
        let beacon = Arc::new(VersionBeacon::new(STARTING_VERSION));
        let status_notifier: StatusNotifier = {
            let beacon = Arc::clone(&beacon);
            Arc::new(move || {
                beacon.bump();
            })
        };
        let buffer = wiring.buffer_factory.create(
            &task_id,
            wiring.buffer_limits,
            Arc::clone(&status_notifier),
        );
        let created_ms = wiring.clock.epoch_ms();
        let state_machine =
            Arc::new(TaskStateMachine::new(task_id.clone(), created_ms, wiring.notifier));

        let task = Arc::new(Self {
            task_id,
            instance_id: Uuid::new_v4().to_string(),
            location: location.into(),
            node_id: node_id.into(),
            clock: wiring.clock,
            state_machine,
            beacon,
            status_notifier,
            holder: TaskHolder::new(),
            buffer,
            exec_factory: wiring.exec_factory,
            update_lock: Mutex::new(()),
            trace_token: Mutex::new(None),
            last_heartbeat_ms: Mutex::new(created_ms),
            on_done: Mutex::new(Some(wiring.on_done)),
            failed_tasks: wiring.failed_tasks,
        });
        task.initialize();
        task
    }

    fn initialize(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.state_machine.add_state_change_listener(move |state| {
            let Some(task) = weak.upgrade() else {
                return;
            };
            if state.is_terminal() {
                task.handle_terminal(state);
            } else {
                task.beacon.bump();
            }
        });
        tracing::info!(task = %self.task_id, instance = %self.instance_id, "task created");
    }

    // ── Identity ────────────────────────────────────────────────────────

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn state_machine(&self) -> &Arc<TaskStateMachine> {
        &self.state_machine
    }

    pub fn version(&self) -> u64 {
        self.beacon.current()
    }

    pub fn state(&self) -> TaskState {
        self.state_machine.state()
    }

    pub fn needs_plan(&self) -> bool {
        self.holder.needs_plan()
    }

    pub fn trace_token(&self) -> Option<String> {
        self.trace_token.lock().clone()
    }

    // ── Update ──────────────────────────────────────────────────────────

    /// Apply a task update from the coordinator node.
    ///
    /// Recoverable execution failures mark the task failed and still return
    /// the post-failure snapshot; fatal failures mark it failed and
    /// propagate. Caller errors (`InvalidArgument`/`InvalidState`) never
    /// change task state.
    pub fn update(
        &self,
        session: &TaskSession,
        fragment: Option<PlanFragment>,
        splits: Vec<SplitAssignment>,
        buffer_spec: OutputBufferSpec,
        domains: Option<VersionedDomains>,
    ) -> Result<TaskInfo, TaskError> {
        match self.try_update(session, fragment, splits, buffer_spec, domains) {
            Ok(info) => Ok(info),
            Err(err) if err.fails_task() => {
                tracing::error!(task = %self.task_id, error = %err, "task update failed");
                self.state_machine.failed(err.to_failure_info());
                if err.is_fatal() {
                    Err(err)
                } else {
                    Ok(self.info())
                }
            }
            Err(err) => Err(err),
        }
    }

    fn try_update(
        &self,
        session: &TaskSession,
        fragment: Option<PlanFragment>,
        splits: Vec<SplitAssignment>,
        buffer_spec: OutputBufferSpec,
        domains: Option<VersionedDomains>,
    ) -> Result<TaskInfo, TaskError> {
        // First non-empty trace token wins
        if let Some(token) = session.trace_token.as_deref().filter(|t| !t.is_empty()) {
            let mut trace_token = self.trace_token.lock();
            if trace_token.is_none() {
                *trace_token = Some(token.to_string());
            }
        }

        // The descriptor must land before the execution exists: a fresh
        // execution may publish results immediately.
        self.buffer.set_output_buffer_spec(buffer_spec)?;

        let execution = {
            let _guard = self.update_lock.lock();
            if let Some(snapshot) = self.holder.final_snapshot() {
                // Late-arriving update on a finalized task
                return Ok(snapshot.info.clone());
            }
            match self.holder.execution() {
                Some(execution) => execution,
                None => {
                    let fragment = fragment.ok_or_else(|| {
                        TaskError::InvalidState(format!(
                            "task {} update carries no plan fragment",
                            self.task_id
                        ))
                    })?;
                    let execution = self.exec_factory.create(
                        session,
                        Arc::clone(&self.state_machine),
                        Arc::clone(&self.buffer),
                        fragment,
                        Arc::clone(&self.status_notifier),
                    )?;
                    if !self.holder.set_live(Arc::clone(&execution)) {
                        // The terminal listener finalized between the check
                        // above and the install; the update is late.
                        if let Some(snapshot) = self.holder.final_snapshot() {
                            return Ok(snapshot.info.clone());
                        }
                    }
                    self.state_machine.transition_to_running();
                    // Execution creation is itself an observable change
                    self.beacon.bump();
                    execution
                }
            }
        };

        // Outside the lock: split intake and consumed-filter routing
        execution.add_split_assignments(splits)?;
        if let Some(domains) = domains {
            execution.update_dynamic_filter_domains(domains)?;
        }
        Ok(self.info())
    }

    // ── Snapshots & long-poll ───────────────────────────────────────────

    pub fn status(&self) -> TaskStatus {
        if let Some(snapshot) = self.holder.final_snapshot() {
            return snapshot.info.status.clone();
        }
        self.build_status()
    }

    pub fn info(&self) -> TaskInfo {
        if let Some(snapshot) = self.holder.final_snapshot() {
            return snapshot.info.clone();
        }
        self.build_info()
    }

    /// Resolve with the current status: immediately when `callers_version`
    /// is already stale or the task is finalized, otherwise on the next
    /// observable change.
    pub async fn await_status(&self, callers_version: u64) -> TaskStatus {
        let current = self.beacon.current();
        if callers_version < current || self.holder.is_final() {
            return self.status();
        }
        self.beacon.wait_newer_than(current).await;
        self.status()
    }

    /// `await_status`, but resolving to the full `TaskInfo`.
    pub async fn await_info(&self, callers_version: u64) -> TaskInfo {
        let current = self.beacon.current();
        if callers_version < current || self.holder.is_final() {
            return self.info();
        }
        self.beacon.wait_newer_than(current).await;
        self.info()
    }

    fn build_status(&self) -> TaskStatus {
        // Version sampled before any value: a change racing this read shows
        // up in the caller's next poll instead of getting lost.
        let version = self.beacon.current();
        let state = self.state_machine.state();
        let execution = self.holder.execution();
        let (pipelines, context) = match &execution {
            Some(execution) => (execution.pipeline_status(), execution.context_stats()),
            None => (Vec::new(), ContextStats::default()),
        };
        let sum = |f: fn(&PipelineStatus) -> u64| pipelines.iter().map(f).sum::<u64>();

        TaskStatus {
            task_id: self.task_id.clone(),
            instance_id: self.instance_id.clone(),
            version,
            state,
            queued_drivers: pipelines.iter().map(|p| p.queued_drivers).sum(),
            running_drivers: pipelines.iter().map(|p| p.running_drivers).sum(),
            queued_split_weight: sum(|p| p.queued_split_weight),
            running_split_weight: sum(|p| p.running_split_weight),
            physical_written_bytes: sum(|p| p.physical_written_bytes),
            user_memory_bytes: context.user_memory_bytes,
            peak_user_memory_bytes: context.peak_user_memory_bytes,
            revocable_memory_bytes: context.revocable_memory_bytes,
            memory_reclaims: context.memory_reclaims,
            memory_reclaim_ms: context.memory_reclaim_ms,
            dynamic_filters_version: self.holder.dynamic_filter_version(),
            failures: self.state_machine.failure_causes(),
            output_buffer_overutilized: self.buffer.is_overutilized(),
        }
    }

    fn build_info(&self) -> TaskInfo {
        let status = self.build_status();
        let execution = self.holder.execution();
        let pipelines =
            execution.as_ref().map(|e| e.pipeline_status()).unwrap_or_default();

        TaskInfo {
            last_heartbeat_ms: *self.last_heartbeat_ms.lock(),
            output_buffers: self.buffer.info(),
            no_more_splits: execution
                .as_ref()
                .map(|e| e.no_more_splits())
                .unwrap_or_default(),
            stats: TaskStats {
                created_at_ms: self.state_machine.created_epoch_ms(),
                queued_drivers: status.queued_drivers,
                running_drivers: status.running_drivers,
                completed_drivers: pipelines.iter().map(|p| p.completed_drivers).sum(),
                io: execution.map(|e| e.io_stats()).unwrap_or_default(),
            },
            needs_plan: self.holder.needs_plan(),
            status,
        }
    }

    // ── Results brokering ───────────────────────────────────────────────

    /// Fetch result pages for one downstream consumer. Pends until pages
    /// arrive or the buffer reaches a terminal state; cancellation is the
    /// buffer's business.
    pub async fn get_results(
        &self,
        buffer: OutputBufferId,
        starting_sequence: u64,
        max_size_bytes: u64,
    ) -> Result<BufferResult, TaskError> {
        if max_size_bytes == 0 {
            return Err(TaskError::InvalidArgument(
                "max_size_bytes must be positive".to_string(),
            ));
        }
        self.buffer.get(buffer, starting_sequence, max_size_bytes).await
    }

    pub fn acknowledge_results(&self, buffer: OutputBufferId, sequence: u64) {
        self.buffer.acknowledge(buffer, sequence);
    }

    /// One downstream consumer is gone for good.
    pub fn destroy_results(&self, buffer: OutputBufferId) -> TaskInfo {
        self.buffer.destroy_buffer(buffer);
        self.info()
    }

    // ── Lifecycle commands ──────────────────────────────────────────────

    pub fn cancel(&self) -> TaskInfo {
        self.state_machine.cancel();
        self.info()
    }

    pub fn abort(&self) -> TaskInfo {
        self.state_machine.abort();
        self.info()
    }

    /// Record a failure cause and fail the task if still possible.
    pub fn failed(&self, cause: FailureInfo) -> TaskInfo {
        self.state_machine.failed(cause);
        self.info()
    }

    /// Liveness signal from a supervisor. Deliberately does not bump the
    /// version: heartbeats alone must not wake long-pollers.
    pub fn record_heartbeat(&self) {
        *self.last_heartbeat_ms.lock() = self.clock.epoch_ms();
    }

    // ── Dynamic filters ─────────────────────────────────────────────────

    /// Domains this task produced that are newer than `callers_version`,
    /// together with the new high-water version.
    pub fn acknowledge_dynamic_filters(&self, callers_version: u64) -> VersionedDomains {
        self.holder.acknowledge_and_get_new_domains(callers_version)
    }

    // ── Termination ─────────────────────────────────────────────────────

    /// Runs on the notification executor for the (single) terminal
    /// transition: snapshot, teardown, owner callback, final notify.
    fn handle_terminal(&self, state: TaskState) {
        if state == TaskState::Failed {
            self.failed_tasks.update(1);
        }

        let snapshot = self.capture_final_snapshot();
        if self.holder.finalize(snapshot).is_none() {
            // Another finalizer won the swap
            return;
        }

        if state.is_failure_terminal() {
            // Upstream producers must observe the error
            self.buffer.abort();
        } else {
            self.buffer.destroy();
        }

        let callback = self.on_done.lock().take();
        if let Some(on_done) = callback {
            if let Err(error) = on_done(&self.info()) {
                tracing::warn!(task = %self.task_id, error = %error, "completion callback failed");
            }
        }

        self.beacon.bump();
        tracing::info!(task = %self.task_id, state = %state, "task finalized");
    }

    fn capture_final_snapshot(&self) -> FinalSnapshot {
        FinalSnapshot {
            info: self.build_info(),
            io_stats: self
                .holder
                .execution()
                .map(|e| e.io_stats())
                .unwrap_or_default(),
            domains: self
                .holder
                .acknowledge_and_get_new_domains(INITIAL_DYNAMIC_FILTERS_VERSION),
        }
    }
}

impl<C: Clock> std::fmt::Debug for WorkerTask<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerTask")
            .field("task_id", &self.task_id)
            .field("instance_id", &self.instance_id)
            .field("state", &self.state_machine.state())
            .field("version", &self.beacon.current())
            .field("needs_plan", &self.holder.needs_plan())
            .finish()
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
