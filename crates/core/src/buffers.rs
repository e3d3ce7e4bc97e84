// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output-buffer descriptors and snapshots.
//!
//! The buffer itself (ring of result pages, backpressure, spooling) lives in
//! the output subsystem; these are the types the coordinator routes between
//! the coordinator node, the buffer, and downstream fetchers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of one downstream consumer's buffer within a task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct OutputBufferId(pub u32);

impl fmt::Display for OutputBufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Versioned descriptor of the buffers a task must maintain.
///
/// The coordinator node may extend the buffer set across updates; once
/// `no_more_buffers` is set the set is complete. Descriptor versions are
/// monotonic, and stale descriptors must be ignored by the buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputBufferSpec {
    pub version: u64,
    /// Buffer id → output partition it consumes
    pub buffers: BTreeMap<OutputBufferId, u32>,
    pub no_more_buffers: bool,
}

impl OutputBufferSpec {
    /// Descriptor with a single buffer, the common exchange case.
    pub fn single(buffer: OutputBufferId, partition: u32) -> Self {
        let mut buffers = BTreeMap::new();
        buffers.insert(buffer, partition);
        Self { version: 1, buffers, no_more_buffers: true }
    }

    pub fn contains(&self, buffer: OutputBufferId) -> bool {
        self.buffers.contains_key(&buffer)
    }
}

/// Byte quantities bounding the task's output buffer, passed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferLimits {
    pub max_buffer_bytes: u64,
    pub max_broadcast_buffer_bytes: u64,
}

impl BufferLimits {
    crate::setters! {
        set {
            max_buffer_bytes: u64,
            max_broadcast_buffer_bytes: u64,
        }
    }
}

impl Default for BufferLimits {
    fn default() -> Self {
        // 32 MiB direct, 128 MiB broadcast
        Self { max_buffer_bytes: 32 << 20, max_broadcast_buffer_bytes: 128 << 20 }
    }
}

/// Point-in-time utilization snapshot reported inside `TaskInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferInfo {
    pub buffered_pages: u64,
    pub buffered_bytes: u64,
    pub pages_sent: u64,
    pub overutilized: bool,
}

/// One answer to a `get_results` fetch: a page batch starting at `sequence`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferResult {
    /// Sequence number of the first page in `pages`
    pub sequence: u64,
    pub pages: Vec<Vec<u8>>,
    /// True once the buffer will never produce another page for this consumer
    pub complete: bool,
}

impl BufferResult {
    pub fn new(sequence: u64, pages: Vec<Vec<u8>>, complete: bool) -> Self {
        Self { sequence, pages, complete }
    }

    /// Batch carrying no pages, used for long-poll timeouts and drained buffers.
    pub fn empty(sequence: u64, complete: bool) -> Self {
        Self { sequence, pages: Vec::new(), complete }
    }

    pub fn next_sequence(&self) -> u64 {
        self.sequence + self.pages.len() as u64
    }
}

#[cfg(test)]
#[path = "buffers_tests.rs"]
mod tests;
