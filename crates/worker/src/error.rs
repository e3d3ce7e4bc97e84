// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error domain of the task coordinator.
//!
//! `InvalidArgument` and `InvalidState` are caller errors and never change
//! task state. `Execution` failures are recoverable at the API boundary: the
//! task is marked failed and the post-failure snapshot is returned normally.
//! `Fatal` marks the task failed and propagates to the caller.

use quern_core::{FailureInfo, FailureKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// A request parameter is unusable (zero page budget, unknown buffer)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not valid in the task's current shape
    /// (e.g. an update without a fragment before execution exists)
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Execution-reported failure; recoverable at the update boundary
    #[error("execution failed: {0}")]
    Execution(String),

    /// Unrecoverable worker-level error; marks the task failed and propagates
    #[error("fatal: {0}")]
    Fatal(String),
}

impl TaskError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, TaskError::Fatal(_))
    }

    /// Whether this error gets recorded as a failure cause on the task.
    /// Caller errors do not fail the task.
    pub fn fails_task(&self) -> bool {
        matches!(self, TaskError::Execution(_) | TaskError::Fatal(_))
    }

    /// Render this error as a reportable failure cause.
    pub fn to_failure_info(&self) -> FailureInfo {
        let kind = match self {
            TaskError::InvalidArgument(_) | TaskError::InvalidState(_) => FailureKind::UserError,
            TaskError::Execution(_) => FailureKind::InternalError,
            TaskError::Fatal(_) => FailureKind::Fatal,
        };
        FailureInfo::new(kind, self.to_string())
    }
}
