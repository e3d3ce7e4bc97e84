// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authoritative task state transitions.
//!
//! All transitions are serialized behind one mutex, so direct `state()` reads
//! are linearizable with respect to transitions. Listener dispatch is
//! asynchronous: each listener owns an unbounded channel drained by a task on
//! the injected notification executor, which preserves per-listener FIFO
//! order without imposing any order across listeners.

use parking_lot::Mutex;
use quern_core::{FailureInfo, TaskId, TaskState};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// The task state machine. Terminal states are entered at most once;
/// `failed` keeps appending causes even after a terminal state is reached.
pub struct TaskStateMachine {
    task_id: TaskId,
    created_epoch_ms: u64,
    /// Notification executor; listener drain tasks are spawned here
    executor: Handle,
    inner: Mutex<Inner>,
}

struct Inner {
    state: TaskState,
    failure_causes: Vec<FailureInfo>,
    state_listeners: Vec<mpsc::UnboundedSender<TaskState>>,
    source_failure_listeners: Vec<mpsc::UnboundedSender<FailureInfo>>,
}

impl Inner {
    fn dispatch_state(&mut self, state: TaskState) {
        self.state_listeners.retain(|tx| tx.send(state).is_ok());
        if state.is_terminal() {
            // Terminal cleanup: dropping the senders lets the drain tasks
            // finish after delivering what is already queued, and releases
            // anything the listeners closed over.
            self.state_listeners.clear();
            self.source_failure_listeners.clear();
        }
    }
}

impl TaskStateMachine {
    pub fn new(task_id: TaskId, created_epoch_ms: u64, executor: Handle) -> Self {
        Self {
            task_id,
            created_epoch_ms,
            executor,
            inner: Mutex::new(Inner {
                state: TaskState::Planned,
                failure_causes: Vec::new(),
                state_listeners: Vec::new(),
                source_failure_listeners: Vec::new(),
            }),
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn created_epoch_ms(&self) -> u64 {
        self.created_epoch_ms
    }

    pub fn state(&self) -> TaskState {
        self.inner.lock().state
    }

    /// Snapshot of the recorded failure causes, in arrival order.
    pub fn failure_causes(&self) -> Vec<FailureInfo> {
        self.inner.lock().failure_causes.clone()
    }

    pub fn transition_to_running(&self) -> bool {
        self.transition(TaskState::Running)
    }

    pub fn transition_to_flushing(&self) -> bool {
        self.transition(TaskState::Flushing)
    }

    pub fn transition_to_finished(&self) -> bool {
        self.transition(TaskState::Finished)
    }

    pub fn cancel(&self) -> bool {
        self.transition(TaskState::Canceled)
    }

    pub fn abort(&self) -> bool {
        self.transition(TaskState::Aborted)
    }

    /// Record a failure cause and move to `Failed` if still possible.
    ///
    /// The cause is appended unconditionally: a task already `Canceled` keeps
    /// its state but still reports the late failure.
    pub fn failed(&self, cause: FailureInfo) -> bool {
        let mut inner = self.inner.lock();
        inner.failure_causes.push(cause);
        if !inner.state.can_transition_to(TaskState::Failed) {
            return false;
        }
        inner.state = TaskState::Failed;
        tracing::info!(task = %self.task_id, "task failed");
        inner.dispatch_state(TaskState::Failed);
        true
    }

    fn transition(&self, next: TaskState) -> bool {
        let mut inner = self.inner.lock();
        if !inner.state.can_transition_to(next) {
            return false;
        }
        inner.state = next;
        tracing::info!(task = %self.task_id, state = %next, "task state changed");
        inner.dispatch_state(next);
        true
    }

    /// Register a state-change listener.
    ///
    /// The listener immediately receives a synthetic notification of the
    /// current state, so registration never races a transition. Dispatch runs
    /// on the notification executor; the listener must not hold anything that
    /// pins the task.
    pub fn add_state_change_listener(&self, mut listener: impl FnMut(TaskState) + Send + 'static) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.executor.spawn(async move {
            while let Some(state) = rx.recv().await {
                listener(state);
            }
        });

        let mut inner = self.inner.lock();
        // Synthetic notification first, under the lock: no transition can
        // slip between it and the registration below.
        let _ = tx.send(inner.state);
        if !inner.state.is_terminal() {
            inner.state_listeners.push(tx);
        }
    }

    /// Register a listener for failures reported by upstream source tasks.
    pub fn add_source_task_failure_listener(
        &self,
        mut listener: impl FnMut(FailureInfo) + Send + 'static,
    ) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.executor.spawn(async move {
            while let Some(cause) = rx.recv().await {
                listener(cause);
            }
        });

        let mut inner = self.inner.lock();
        if !inner.state.is_terminal() {
            inner.source_failure_listeners.push(tx);
        }
    }

    /// Report a failure observed on an upstream source task.
    pub fn source_task_failed(&self, cause: FailureInfo) {
        let mut inner = self.inner.lock();
        inner.source_failure_listeners.retain(|tx| tx.send(cause.clone()).is_ok());
    }
}

#[cfg(test)]
#[path = "state_machine_tests.rs"]
mod tests;
