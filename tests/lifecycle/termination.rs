// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal races: exactly one terminal state, exactly one finalization,
//! and the right buffer teardown on each path.

use super::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failure_races_completion_deterministically() {
    for round in 0..16 {
        let harness = TaskHarness::create();
        harness.start().unwrap();
        harness.task.state_machine().transition_to_flushing();

        let machine_a = Arc::clone(harness.task.state_machine());
        let machine_b = Arc::clone(harness.task.state_machine());
        let fail = std::thread::spawn(move || {
            machine_a.failed(execution_failure("page transport closed"))
        });
        let finish = std::thread::spawn(move || machine_b.transition_to_finished());

        let failed_won = fail.join().unwrap();
        let finished_won = finish.join().unwrap();
        assert!(
            failed_won ^ finished_won,
            "round {round}: exactly one terminal command must win"
        );

        assert!(eventually(|| harness.done_count() == 1).await);
        let state = harness.task.state();
        if failed_won {
            assert_eq!(state, TaskState::Failed);
            assert_eq!(harness.buffer.abort_calls(), 1);
            assert_eq!(harness.buffer.destroy_calls(), 0);
        } else {
            assert_eq!(state, TaskState::Finished);
            assert_eq!(harness.buffer.destroy_calls(), 1);
            assert_eq!(harness.buffer.abort_calls(), 0);
        }

        // Subsequent transitions are no-ops
        harness.task.cancel();
        assert_eq!(harness.task.state(), state);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_terminal_triggers_finalize_once() {
    for _ in 0..16 {
        let harness = TaskHarness::create();
        harness.start().unwrap();

        let triggers: Vec<_> = (0..4)
            .map(|i| {
                let task = Arc::clone(&harness.task);
                std::thread::spawn(move || {
                    if i % 2 == 0 {
                        task.failed(execution_failure("boom"));
                    } else {
                        task.cancel();
                    }
                })
            })
            .collect();
        for trigger in triggers {
            trigger.join().unwrap();
        }

        assert!(eventually(|| harness.done_count() == 1).await);
        // Settled: still exactly one completion callback
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(harness.done_count(), 1);

        let failed = harness.task.state() == TaskState::Failed;
        assert_eq!(harness.failed_tasks.total(), u64::from(failed));
        assert_eq!(harness.buffer.abort_calls() + harness.buffer.destroy_calls(), 1);
    }
}

#[tokio::test]
async fn finalized_snapshots_never_change_again() {
    let harness = TaskHarness::create();
    harness.start().unwrap();
    harness.task.failed(execution_failure("worker oom"));
    assert!(eventually(|| harness.done_count() == 1).await);

    let first_info = harness.task.info();
    let first_status = harness.task.status();

    // Poke every mutable input; the frozen snapshot must not move
    harness.buffer.set_overutilized(true);
    harness.task.record_heartbeat();
    harness.task.cancel();

    assert_eq!(harness.task.info(), first_info);
    assert_eq!(harness.task.status(), first_status);
    assert_eq!(
        serde_json::to_string(&harness.task.info()).unwrap(),
        serde_json::to_string(&first_info).unwrap()
    );
}

#[tokio::test]
async fn late_failure_on_a_canceled_task_records_the_cause() {
    let harness = TaskHarness::create();
    harness.start().unwrap();
    harness.task.cancel();
    assert!(eventually(|| harness.task.state() == TaskState::Canceled).await);

    harness.task.failed(execution_failure("late failure"));

    // State unchanged, cause recorded, no second finalization
    assert_eq!(harness.task.state(), TaskState::Canceled);
    let causes = harness.task.state_machine().failure_causes();
    assert_eq!(causes.len(), 1);
    assert_eq!(harness.failed_tasks.total(), 0);
}

#[tokio::test]
async fn first_cause_wins_but_all_are_reported() {
    let harness = TaskHarness::create();
    harness.start().unwrap();

    harness.task.failed(execution_failure("root cause"));
    harness.task.failed(execution_failure("secondary"));
    assert!(eventually(|| harness.task.info().state() == TaskState::Failed).await);

    let causes = harness.task.state_machine().failure_causes();
    let messages: Vec<_> = causes.iter().map(|c| c.message.as_str()).collect();
    assert_eq!(messages, vec!["root cause", "secondary"]);
    assert_eq!(harness.failed_tasks.total(), 1);
}
