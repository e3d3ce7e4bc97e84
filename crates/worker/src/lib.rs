// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! quern-worker: the per-task lifecycle coordinator.
//!
//! Each stage instance dispatched to this worker materializes as a
//! [`WorkerTask`]: the synchronization hub that routes control commands,
//! publishes versioned status snapshots to long-poll clients, brokers output
//! buffer access, and guarantees exactly-once finalization.

pub mod beacon;
pub mod error;
pub mod execution;
pub mod holder;
pub mod metrics;
pub mod state_machine;
pub mod task;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use beacon::VersionBeacon;
pub use error::TaskError;
pub use execution::{
    ContextStats, ExecutionFactory, OutputBuffer, OutputBufferFactory, PipelineStatus,
    StatusNotifier, TaskExecution,
};
pub use holder::{FinalSnapshot, TaskHolder};
pub use metrics::CounterStat;
pub use state_machine::TaskStateMachine;
pub use task::{BoxError, DoneCallback, TaskWiring, WorkerTask};
