// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tri-state snapshot of execution progress.
//!
//! The holder starts `Empty`, becomes `Live` when the first plan fragment
//! produces an execution, and is frozen to `Final` exactly once by the
//! terminal-state listener. Each install is a compare-and-swap behind the
//! holder lock: a losing writer observes the winner and backs off.

use crate::execution::TaskExecution;
use parking_lot::RwLock;
use quern_core::{IoStats, TaskInfo, VersionedDomains};
use std::sync::Arc;

/// Everything frozen at the moment of terminal transition.
#[derive(Debug, Clone)]
pub struct FinalSnapshot {
    pub info: TaskInfo,
    pub io_stats: IoStats,
    pub domains: VersionedDomains,
}

enum HolderState {
    Empty,
    Live(Arc<dyn TaskExecution>),
    Final(Arc<FinalSnapshot>),
}

pub struct TaskHolder {
    state: RwLock<HolderState>,
}

impl Default for TaskHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskHolder {
    pub fn new() -> Self {
        Self { state: RwLock::new(HolderState::Empty) }
    }

    /// True until an execution has been installed. Frozen tasks no longer
    /// need a plan either.
    pub fn needs_plan(&self) -> bool {
        matches!(*self.state.read(), HolderState::Empty)
    }

    pub fn is_final(&self) -> bool {
        matches!(*self.state.read(), HolderState::Final(_))
    }

    pub fn execution(&self) -> Option<Arc<dyn TaskExecution>> {
        match &*self.state.read() {
            HolderState::Live(execution) => Some(Arc::clone(execution)),
            _ => None,
        }
    }

    pub fn final_snapshot(&self) -> Option<Arc<FinalSnapshot>> {
        match &*self.state.read() {
            HolderState::Final(snapshot) => Some(Arc::clone(snapshot)),
            _ => None,
        }
    }

    /// Install the execution. Succeeds only from `Empty`; a holder that is
    /// already `Live` or `Final` is left untouched.
    pub fn set_live(&self, execution: Arc<dyn TaskExecution>) -> bool {
        let mut state = self.state.write();
        match *state {
            HolderState::Empty => {
                *state = HolderState::Live(execution);
                true
            }
            _ => false,
        }
    }

    /// Freeze the terminal snapshot. Returns the installed snapshot when this
    /// call performed the swap, `None` when another finalizer won.
    pub fn finalize(&self, snapshot: FinalSnapshot) -> Option<Arc<FinalSnapshot>> {
        let mut state = self.state.write();
        match *state {
            HolderState::Final(_) => None,
            _ => {
                let snapshot = Arc::new(snapshot);
                *state = HolderState::Final(Arc::clone(&snapshot));
                Some(snapshot)
            }
        }
    }

    /// Dynamic-filter view: deltas from the execution while `Live`, the empty
    /// initial set while `Empty`, the frozen set once `Final`.
    pub fn acknowledge_and_get_new_domains(&self, callers_version: u64) -> VersionedDomains {
        match &*self.state.read() {
            HolderState::Empty => VersionedDomains::initial(),
            HolderState::Live(execution) => {
                execution.acknowledge_and_get_new_dynamic_filter_domains(callers_version)
            }
            HolderState::Final(snapshot) => snapshot.domains.clone(),
        }
    }

    /// High-water domain version for the status snapshot.
    pub fn dynamic_filter_version(&self) -> u64 {
        match &*self.state.read() {
            HolderState::Empty => quern_core::INITIAL_DYNAMIC_FILTERS_VERSION,
            HolderState::Live(execution) => execution.dynamic_filter_version(),
            HolderState::Final(snapshot) => snapshot.domains.version,
        }
    }
}

#[cfg(test)]
#[path = "holder_tests.rs"]
mod tests;
