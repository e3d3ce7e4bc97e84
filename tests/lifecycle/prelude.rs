// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared imports and helpers for the lifecycle specs.

pub use quern_core::test_support::{domains_at_version, test_fragment, test_task_id};
pub use quern_core::{
    Catalog, CatalogError, CatalogRegistry, Domain, DynamicFilterId, FailureInfo, FailureKind,
    OutputBufferId, OutputBufferSpec, TaskState, VersionedDomains, STARTING_VERSION,
};
pub use quern_worker::test_support::{eventually, TaskHarness};
pub use quern_worker::TaskError;
pub use std::sync::Arc;
pub use std::time::Duration;

/// A failure cause as the operator runtime would report it.
pub fn execution_failure(message: &str) -> FailureInfo {
    FailureInfo::new(FailureKind::InternalError, message)
}
