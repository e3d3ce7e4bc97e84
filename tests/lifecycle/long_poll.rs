// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Long-poll wake-up: waiters holding a version are released by the next
//! observable change and never by heartbeats.

use super::prelude::*;

#[tokio::test]
async fn waiter_is_released_by_cancel() {
    let harness = TaskHarness::create();
    harness.start().unwrap();
    let version = harness.task.version();

    let task = Arc::clone(&harness.task);
    let waiter = tokio::spawn(async move { task.await_status(version).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    harness.task.cancel();

    let status = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter must be released")
        .unwrap();
    assert_eq!(status.state, TaskState::Canceled);
}

#[tokio::test]
async fn waiter_is_released_by_execution_progress() {
    let harness = TaskHarness::create();
    harness.start().unwrap();
    let version = harness.task.version();

    let task = Arc::clone(&harness.task);
    let waiter = tokio::spawn(async move { task.await_info(version).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    // A page landing in the output buffer is an observable change
    harness.buffer.push_page(OutputBufferId(0), vec![7]);

    let info = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter must be released")
        .unwrap();
    assert!(info.version() > version);
}

#[tokio::test]
async fn stale_version_resolves_immediately() {
    let harness = TaskHarness::create();
    harness.start().unwrap();

    let status = harness.task.await_status(0).await;
    assert_eq!(status.state, TaskState::Running);
}

#[tokio::test]
async fn heartbeats_do_not_wake_waiters() {
    let harness = TaskHarness::create();
    harness.start().unwrap();
    let version = harness.task.version();

    let task = Arc::clone(&harness.task);
    let waiter = tokio::spawn(async move { task.await_status(version).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    harness.clock.advance(Duration::from_secs(5));
    harness.task.record_heartbeat();

    // Still pending after the heartbeat
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    harness.task.cancel();
    let status = waiter.await.unwrap();
    assert_eq!(status.state, TaskState::Canceled);
}

#[tokio::test]
async fn many_concurrent_waiters_all_see_the_change() {
    let harness = TaskHarness::create();
    harness.start().unwrap();
    let version = harness.task.version();

    let waiters: Vec<_> = (0..32)
        .map(|_| {
            let task = Arc::clone(&harness.task);
            tokio::spawn(async move { task.await_status(version).await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(10)).await;

    harness.task.cancel();

    for waiter in waiters {
        let status = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("every waiter must be released")
            .unwrap();
        assert!(status.version > version || status.state == TaskState::Canceled);
    }
}
