// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monotonic status version with lossless wake-up for long-poll waiters.
//!
//! Built on a `tokio::sync::watch` channel: `send_modify` makes the counter
//! increment and the waiter release a single atomic step, so a waiter that
//! observed version V can never miss the change that makes the counter
//! exceed V.

use tokio::sync::watch;

pub struct VersionBeacon {
    tx: watch::Sender<u64>,
}

impl VersionBeacon {
    pub fn new(starting_version: u64) -> Self {
        let (tx, _rx) = watch::channel(starting_version);
        Self { tx }
    }

    pub fn current(&self) -> u64 {
        *self.tx.borrow()
    }

    /// Increment the version and release every waiter in one atomic step.
    /// Returns the post-increment version.
    pub fn bump(&self) -> u64 {
        let mut bumped = 0;
        self.tx.send_modify(|version| {
            *version = version.saturating_add(1);
            bumped = *version;
        });
        bumped
    }

    /// Wait until the version exceeds `callers_version`; resolves immediately
    /// when it already does. Returns the version observed at release.
    pub async fn wait_newer_than(&self, callers_version: u64) -> u64 {
        let mut rx = self.tx.subscribe();
        let result = match rx.wait_for(|version| *version > callers_version).await {
            Ok(version) => *version,
            // The sender lives as long as the beacon; unreachable while the
            // task exists, and the current value is the right answer anyway.
            Err(_) => self.current(),
        };
        result
    }
}

#[cfg(test)]
#[path = "beacon_tests.rs"]
mod tests;
