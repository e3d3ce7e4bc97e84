// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lazy creation: a task exists before its plan fragment arrives.

use super::prelude::*;

#[tokio::test]
async fn task_is_planned_until_a_fragment_arrives() {
    let harness = TaskHarness::create();

    let status = harness.task.status();
    assert_eq!(status.state, TaskState::Planned);
    assert!(harness.task.needs_plan());

    // An update without a fragment is rejected without harming the task
    let err = harness
        .task
        .update(
            &harness.session(),
            None,
            Vec::new(),
            OutputBufferSpec::single(OutputBufferId(0), 0),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, TaskError::InvalidState(_)));
    assert_eq!(harness.task.state(), TaskState::Planned);
    assert!(harness.task.needs_plan());

    // The fragment arrives: execution is created and the task runs
    let info = harness.start().unwrap();
    assert_eq!(info.state(), TaskState::Running);
    assert!(!info.needs_plan);
    assert!(info.version() >= 2);
}

#[tokio::test]
async fn needs_plan_tracks_the_holder_everywhere() {
    let harness = TaskHarness::create();
    assert!(harness.task.info().needs_plan);

    harness.start().unwrap();
    assert!(!harness.task.info().needs_plan);

    // Finalization keeps it cleared
    harness.task.cancel();
    assert!(eventually(|| harness.task.info().state() == TaskState::Canceled).await);
    assert!(!harness.task.needs_plan());
}

#[tokio::test]
async fn version_grows_across_the_first_update() {
    let harness = TaskHarness::create();
    let at_creation = harness.task.version();
    assert!(at_creation >= STARTING_VERSION);

    harness.start().unwrap();
    assert!(harness.task.version() > at_creation);
}
