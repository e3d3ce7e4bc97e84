// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! quern-core: domain types for the quern worker — task identifiers and
//! states, status snapshots, dynamic-filter domains, plan/split/buffer DTOs,
//! and the process-wide catalog registry.

pub mod macros;

pub mod buffers;
pub mod catalog;
pub mod clock;
pub mod domains;
pub mod plan;
pub mod session;
pub mod status;
pub mod task;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use buffers::{BufferInfo, BufferLimits, BufferResult, OutputBufferId, OutputBufferSpec};
pub use catalog::{Catalog, CatalogError, CatalogRegistry};
pub use clock::{Clock, FakeClock, SystemClock};
pub use domains::{
    Domain, DynamicFilterId, VersionedDomains, INITIAL_DYNAMIC_FILTERS_VERSION,
};
pub use plan::{PlanFragment, PlanNodeId, Split, SplitAssignment};
pub use session::TaskSession;
pub use status::{IoStats, TaskInfo, TaskStats, TaskStatus, STARTING_VERSION};
pub use task::{FailureInfo, FailureKind, ParseTaskIdError, QueryId, TaskId, TaskState};
