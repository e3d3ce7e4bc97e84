// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stub collaborators for exercising the coordinator without an operator
//! runtime or an exchange subsystem.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::error::TaskError;
use crate::execution::{
    ContextStats, ExecutionFactory, OutputBuffer, OutputBufferFactory, PipelineStatus,
    StatusNotifier, TaskExecution,
};
use crate::metrics::CounterStat;
use crate::state_machine::TaskStateMachine;
use crate::task::{TaskWiring, WorkerTask};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use quern_core::test_support::{test_fragment, test_task_id};
use quern_core::{
    BufferInfo, BufferLimits, BufferResult, Domain, DynamicFilterId, FakeClock, IoStats,
    OutputBufferId, OutputBufferSpec, PlanFragment, PlanNodeId, SplitAssignment, TaskId,
    TaskInfo, TaskSession, VersionedDomains,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

// ── Execution ───────────────────────────────────────────────────────────

#[derive(Default)]
struct StubExecutionInner {
    assignments: Vec<SplitAssignment>,
    no_more: BTreeSet<PlanNodeId>,
    consumed_domains: Vec<VersionedDomains>,
    pipelines: Vec<PipelineStatus>,
    context: ContextStats,
    io: IoStats,
    /// Published domain journal: (version, filter, domain)
    journal: Vec<(u64, DynamicFilterId, Domain)>,
    fail_splits_with: Option<TaskError>,
}

/// Scripted execution: tests feed it stats and domain publications and assert
/// on what the coordinator routed into it.
#[derive(Default)]
pub struct StubExecution {
    inner: Mutex<StubExecutionInner>,
}

impl StubExecution {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Publish a domain refinement at the next version. Returns that version.
    pub fn publish_domain(&self, filter: impl Into<DynamicFilterId>, domain: Domain) -> u64 {
        let mut inner = self.inner.lock();
        let version = VersionedDomains::next_version(
            inner.journal.iter().map(|(v, _, _)| *v).max().unwrap_or(0),
        );
        inner.journal.push((version, filter.into(), domain));
        version
    }

    pub fn set_pipelines(&self, pipelines: Vec<PipelineStatus>) {
        self.inner.lock().pipelines = pipelines;
    }

    pub fn set_context_stats(&self, context: ContextStats) {
        self.inner.lock().context = context;
    }

    pub fn set_io_stats(&self, io: IoStats) {
        self.inner.lock().io = io;
    }

    /// Make the next `add_split_assignments` call fail.
    pub fn fail_splits_with(&self, err: TaskError) {
        self.inner.lock().fail_splits_with = Some(err);
    }

    pub fn assignments(&self) -> Vec<SplitAssignment> {
        self.inner.lock().assignments.clone()
    }

    pub fn consumed_domains(&self) -> Vec<VersionedDomains> {
        self.inner.lock().consumed_domains.clone()
    }
}

impl TaskExecution for StubExecution {
    fn add_split_assignments(&self, assignments: Vec<SplitAssignment>) -> Result<(), TaskError> {
        let mut inner = self.inner.lock();
        if let Some(err) = inner.fail_splits_with.take() {
            return Err(err);
        }
        for assignment in &assignments {
            if assignment.no_more_splits {
                inner.no_more.insert(assignment.plan_node.clone());
            }
        }
        inner.assignments.extend(assignments);
        Ok(())
    }

    fn update_dynamic_filter_domains(&self, domains: VersionedDomains) -> Result<(), TaskError> {
        self.inner.lock().consumed_domains.push(domains);
        Ok(())
    }

    fn no_more_splits(&self) -> BTreeSet<PlanNodeId> {
        self.inner.lock().no_more.clone()
    }

    fn pipeline_status(&self) -> Vec<PipelineStatus> {
        self.inner.lock().pipelines.clone()
    }

    fn context_stats(&self) -> ContextStats {
        self.inner.lock().context
    }

    fn io_stats(&self) -> IoStats {
        self.inner.lock().io
    }

    fn dynamic_filter_version(&self) -> u64 {
        self.inner.lock().journal.iter().map(|(v, _, _)| *v).max().unwrap_or(0)
    }

    fn acknowledge_and_get_new_dynamic_filter_domains(
        &self,
        callers_version: u64,
    ) -> VersionedDomains {
        let inner = self.inner.lock();
        let high_water = inner.journal.iter().map(|(v, _, _)| *v).max().unwrap_or(0);
        let mut domains = IndexMap::new();
        for (version, filter, domain) in &inner.journal {
            if *version > callers_version {
                domains.insert(filter.clone(), domain.clone());
            }
        }
        VersionedDomains::new(high_water.max(callers_version), domains)
    }
}

// ── Execution factory ───────────────────────────────────────────────────

struct StubFactoryInner {
    fail_with: Option<TaskError>,
    last_session: Option<TaskSession>,
    last_fragment: Option<PlanFragment>,
}

/// Factory handing out one shared `StubExecution`.
pub struct StubExecutionFactory {
    execution: Arc<StubExecution>,
    created: AtomicU32,
    inner: Mutex<StubFactoryInner>,
}

impl StubExecutionFactory {
    pub fn new(execution: Arc<StubExecution>) -> Arc<Self> {
        Arc::new(Self {
            execution,
            created: AtomicU32::new(0),
            inner: Mutex::new(StubFactoryInner {
                fail_with: None,
                last_session: None,
                last_fragment: None,
            }),
        })
    }

    /// Make the next `create` call fail.
    pub fn fail_with(&self, err: TaskError) {
        self.inner.lock().fail_with = Some(err);
    }

    pub fn created_count(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }

    pub fn last_fragment(&self) -> Option<PlanFragment> {
        self.inner.lock().last_fragment.clone()
    }

    pub fn last_session(&self) -> Option<TaskSession> {
        self.inner.lock().last_session.clone()
    }
}

impl ExecutionFactory for StubExecutionFactory {
    fn create(
        &self,
        session: &TaskSession,
        _state_machine: Arc<TaskStateMachine>,
        _buffer: Arc<dyn OutputBuffer>,
        fragment: PlanFragment,
        _status_notifier: StatusNotifier,
    ) -> Result<Arc<dyn TaskExecution>, TaskError> {
        let mut inner = self.inner.lock();
        if let Some(err) = inner.fail_with.take() {
            return Err(err);
        }
        inner.last_session = Some(session.clone());
        inner.last_fragment = Some(fragment);
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.execution) as Arc<dyn TaskExecution>)
    }
}

// ── Output buffer ───────────────────────────────────────────────────────

#[derive(Default)]
struct StubBufferInner {
    spec: Option<OutputBufferSpec>,
    pages: BTreeMap<OutputBufferId, Vec<Vec<u8>>>,
    acknowledged: Vec<(OutputBufferId, u64)>,
    destroyed_buffers: BTreeSet<OutputBufferId>,
    overutilized: bool,
    on_change: Option<StatusNotifier>,
}

/// Recording buffer: serves scripted pages and counts lifecycle calls.
#[derive(Default)]
pub struct StubBuffer {
    inner: Mutex<StubBufferInner>,
    destroy_calls: AtomicU32,
    abort_calls: AtomicU32,
    page_arrived: Notify,
}

impl StubBuffer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Enqueue a page for one consumer, firing the status notifier like a
    /// real buffer does on every observable change.
    pub fn push_page(&self, buffer: OutputBufferId, page: Vec<u8>) {
        let on_change = {
            let mut inner = self.inner.lock();
            inner.pages.entry(buffer).or_default().push(page);
            inner.on_change.clone()
        };
        self.page_arrived.notify_waiters();
        if let Some(notify) = on_change {
            notify();
        }
    }

    pub fn set_overutilized(&self, overutilized: bool) {
        self.inner.lock().overutilized = overutilized;
    }

    pub fn spec(&self) -> Option<OutputBufferSpec> {
        self.inner.lock().spec.clone()
    }

    pub fn acknowledged(&self) -> Vec<(OutputBufferId, u64)> {
        self.inner.lock().acknowledged.clone()
    }

    pub fn destroyed_buffers(&self) -> BTreeSet<OutputBufferId> {
        self.inner.lock().destroyed_buffers.clone()
    }

    pub fn destroy_calls(&self) -> u32 {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    pub fn abort_calls(&self) -> u32 {
        self.abort_calls.load(Ordering::SeqCst)
    }

    fn is_torn_down(&self) -> bool {
        self.destroy_calls() > 0 || self.abort_calls() > 0
    }

    fn try_get(
        &self,
        buffer: OutputBufferId,
        starting_sequence: u64,
        max_size_bytes: u64,
    ) -> Option<BufferResult> {
        let inner = self.inner.lock();
        let pages = inner.pages.get(&buffer).cloned().unwrap_or_default();
        let torn_down = self.is_torn_down();
        if (starting_sequence as usize) < pages.len() {
            let mut batch = Vec::new();
            let mut budget = max_size_bytes;
            for page in pages.iter().skip(starting_sequence as usize) {
                if !batch.is_empty() && page.len() as u64 > budget {
                    break;
                }
                budget = budget.saturating_sub(page.len() as u64);
                batch.push(page.clone());
            }
            return Some(BufferResult::new(starting_sequence, batch, torn_down));
        }
        if torn_down || inner.destroyed_buffers.contains(&buffer) {
            return Some(BufferResult::empty(starting_sequence, true));
        }
        None
    }
}

#[async_trait]
impl OutputBuffer for StubBuffer {
    fn set_output_buffer_spec(&self, spec: OutputBufferSpec) -> Result<(), TaskError> {
        let mut inner = self.inner.lock();
        // Stale descriptors are ignored, newer ones replace
        match &inner.spec {
            Some(current) if current.version >= spec.version => {}
            _ => inner.spec = Some(spec),
        }
        Ok(())
    }

    async fn get(
        &self,
        buffer: OutputBufferId,
        starting_sequence: u64,
        max_size_bytes: u64,
    ) -> Result<BufferResult, TaskError> {
        loop {
            // Arm the wakeup before checking, so a page landing between the
            // check and the await is not lost.
            let notified = self.page_arrived.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(result) = self.try_get(buffer, starting_sequence, max_size_bytes) {
                return Ok(result);
            }
            notified.await;
        }
    }

    fn acknowledge(&self, buffer: OutputBufferId, sequence: u64) {
        self.inner.lock().acknowledged.push((buffer, sequence));
    }

    fn destroy_buffer(&self, buffer: OutputBufferId) {
        self.inner.lock().destroyed_buffers.insert(buffer);
        self.page_arrived.notify_waiters();
    }

    fn destroy(&self) {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        self.page_arrived.notify_waiters();
    }

    fn abort(&self) {
        self.abort_calls.fetch_add(1, Ordering::SeqCst);
        self.page_arrived.notify_waiters();
    }

    fn info(&self) -> BufferInfo {
        let inner = self.inner.lock();
        let buffered_pages: u64 = inner.pages.values().map(|p| p.len() as u64).sum();
        let buffered_bytes: u64 =
            inner.pages.values().flatten().map(|page| page.len() as u64).sum();
        BufferInfo {
            buffered_pages,
            buffered_bytes,
            pages_sent: inner.acknowledged.len() as u64,
            overutilized: inner.overutilized,
        }
    }

    fn is_overutilized(&self) -> bool {
        self.inner.lock().overutilized
    }
}

/// Factory handing out one shared `StubBuffer`, capturing the notifier the
/// coordinator wires in.
pub struct StubBufferFactory {
    buffer: Arc<StubBuffer>,
    limits_seen: Mutex<Option<BufferLimits>>,
}

impl StubBufferFactory {
    pub fn new(buffer: Arc<StubBuffer>) -> Self {
        Self { buffer, limits_seen: Mutex::new(None) }
    }

    pub fn limits_seen(&self) -> Option<BufferLimits> {
        *self.limits_seen.lock()
    }
}

impl OutputBufferFactory for StubBufferFactory {
    fn create(
        &self,
        _task_id: &TaskId,
        limits: BufferLimits,
        on_change: StatusNotifier,
    ) -> Arc<dyn OutputBuffer> {
        *self.limits_seen.lock() = Some(limits);
        self.buffer.inner.lock().on_change = Some(on_change);
        Arc::clone(&self.buffer) as Arc<dyn OutputBuffer>
    }
}

// ── Task harness ────────────────────────────────────────────────────────

/// A fully wired task with stub collaborators.
///
/// Must be created inside a tokio runtime; the runtime doubles as the
/// notification executor.
pub struct TaskHarness {
    pub task: Arc<WorkerTask<FakeClock>>,
    pub clock: FakeClock,
    pub execution: Arc<StubExecution>,
    pub factory: Arc<StubExecutionFactory>,
    pub buffer: Arc<StubBuffer>,
    pub buffer_factory: Arc<StubBufferFactory>,
    pub failed_tasks: CounterStat,
    pub done_infos: Arc<Mutex<Vec<TaskInfo>>>,
}

impl TaskHarness {
    pub fn create() -> Self {
        Self::create_for(test_task_id(0))
    }

    pub fn create_for(task_id: TaskId) -> Self {
        let clock = FakeClock::new();
        let execution = StubExecution::new();
        let factory = StubExecutionFactory::new(Arc::clone(&execution));
        let buffer = StubBuffer::new();
        let buffer_factory = Arc::new(StubBufferFactory::new(Arc::clone(&buffer)));
        let failed_tasks = CounterStat::new();
        let done_infos: Arc<Mutex<Vec<TaskInfo>>> = Arc::new(Mutex::new(Vec::new()));

        let on_done = {
            let done_infos = Arc::clone(&done_infos);
            Box::new(move |info: &TaskInfo| {
                done_infos.lock().push(info.clone());
                Ok(())
            }) as crate::task::DoneCallback
        };

        let task = WorkerTask::create(
            task_id,
            "http://worker-0:8080/v1/task/0",
            "worker-0",
            TaskWiring {
                clock: clock.clone(),
                exec_factory: Arc::clone(&factory) as Arc<dyn ExecutionFactory>,
                buffer_factory: Arc::clone(&buffer_factory) as Arc<dyn OutputBufferFactory>,
                buffer_limits: BufferLimits::default(),
                notifier: tokio::runtime::Handle::current(),
                on_done,
                failed_tasks: failed_tasks.clone(),
            },
        );

        Self { task, clock, execution, factory, buffer, buffer_factory, failed_tasks, done_infos }
    }

    pub fn session(&self) -> TaskSession {
        TaskSession::new("test_query", "test_user")
    }

    /// Apply the first update: default fragment, no splits, a single buffer.
    pub fn start(&self) -> Result<TaskInfo, TaskError> {
        self.task.update(
            &self.session(),
            Some(test_fragment()),
            Vec::new(),
            OutputBufferSpec::single(OutputBufferId(0), 0),
            None,
        )
    }

    pub fn done_count(&self) -> usize {
        self.done_infos.lock().len()
    }
}

/// Await a condition driven by the notification executor.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    false
}
