// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared counters exported to the worker's stats endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cheap cloneable monotonic counter (e.g. failed tasks per worker).
#[derive(Debug, Clone, Default)]
pub struct CounterStat {
    count: Arc<AtomicU64>,
}

impl CounterStat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, delta: u64) {
        self.count.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
