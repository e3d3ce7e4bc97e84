// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identifiers, the task state machine's state set, and failure causes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of the query a task belongs to, assigned by the coordinator node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(pub String);

impl QueryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for QueryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of one attempt at executing one stage partition on one worker.
///
/// The tuple `(query, stage, partition, attempt)` is assigned by the
/// coordinator node and is stable for the task's whole lifetime. Renders and
/// parses as `query.stage.partition.attempt`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    pub query: QueryId,
    pub stage: u32,
    pub partition: u32,
    pub attempt: u32,
}

impl TaskId {
    pub fn new(query: impl Into<QueryId>, stage: u32, partition: u32, attempt: u32) -> Self {
        Self { query: query.into(), stage, partition, attempt }
    }

    pub fn query_id(&self) -> &QueryId {
        &self.query
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.query, self.stage, self.partition, self.attempt)
    }
}

/// Error parsing a task id from its `query.stage.partition.attempt` form.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("malformed task id: {0:?}")]
pub struct ParseTaskIdError(pub String);

impl FromStr for TaskId {
    type Err = ParseTaskIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The query id may itself contain dots; the three numeric fields are
        // always the last three dot-separated segments.
        let mut parts = s.rsplitn(4, '.');
        let (attempt, partition, stage, query) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(a), Some(p), Some(st), Some(q)) if !q.is_empty() => (a, p, st, q),
                _ => return Err(ParseTaskIdError(s.to_string())),
            };
        let parse = |v: &str| v.parse::<u32>().map_err(|_| ParseTaskIdError(s.to_string()));
        Ok(Self {
            query: QueryId::new(query),
            stage: parse(stage)?,
            partition: parse(partition)?,
            attempt: parse(attempt)?,
        })
    }
}

impl Serialize for TaskId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// State of a task on this worker.
///
/// `Finished`, `Canceled`, `Aborted`, and `Failed` are terminal: once entered
/// no further transition is observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Created, no plan fragment received yet
    Planned,
    /// Executing pipelines
    Running,
    /// All drivers finished, output buffer draining
    Flushing,
    /// Output fully consumed
    Finished,
    /// Canceled by the coordinator node (results no longer needed)
    Canceled,
    /// Aborted by the coordinator node (query-level failure elsewhere)
    Aborted,
    /// Failed on this worker
    Failed,
}

crate::simple_display! {
    TaskState {
        Planned => "planned",
        Running => "running",
        Flushing => "flushing",
        Finished => "finished",
        Canceled => "canceled",
        Aborted => "aborted",
        Failed => "failed",
    }
}

impl TaskState {
    /// Check if this state is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Finished | TaskState::Canceled | TaskState::Aborted | TaskState::Failed
        )
    }

    /// Check if this is a failure-class terminal (output must be aborted,
    /// not drained).
    pub fn is_failure_terminal(self) -> bool {
        matches!(self, TaskState::Aborted | TaskState::Failed)
    }

    /// Whether a direct transition from `self` to `next` is legal.
    ///
    /// Legal edges: `Planned → Running`, `Running → Flushing → Finished`,
    /// and any non-terminal state into `Canceled`/`Aborted`/`Failed`.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            TaskState::Planned => false,
            TaskState::Running => self == TaskState::Planned,
            TaskState::Flushing => self == TaskState::Running,
            TaskState::Finished => self == TaskState::Flushing,
            TaskState::Canceled | TaskState::Aborted | TaskState::Failed => true,
        }
    }
}

/// Classification of a recorded failure cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Caused by the query or its inputs
    UserError,
    /// Execution-reported internal failure
    InternalError,
    /// Unrecoverable worker-level error
    Fatal,
}

crate::simple_display! {
    FailureKind {
        UserError => "user_error",
        InternalError => "internal_error",
        Fatal => "fatal",
    }
}

/// A failure cause retained for reporting.
///
/// The first recorded cause wins semantically; later causes are kept in
/// arrival order so the coordinator node sees the full picture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub kind: FailureKind,
    pub message: String,
}

impl FailureInfo {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl fmt::Display for FailureInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
