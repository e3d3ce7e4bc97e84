// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dynamic-filter delta retrieval: callers get exactly the domains newer
//! than their version, and the frozen set after finalization.

use super::prelude::*;

#[tokio::test]
async fn deltas_contain_exactly_the_newer_domains() {
    let harness = TaskHarness::create();
    harness.start().unwrap();

    let v1 = harness.execution.publish_domain("df_build", Domain::values([1.into()]));
    let v2 = harness.execution.publish_domain("df_probe", Domain::values([2.into()]));
    let v3 = harness.execution.publish_domain("df_join", Domain::values([3.into()]));
    assert_eq!((v1, v2, v3), (1, 2, 3));

    let deltas = harness.task.acknowledge_dynamic_filters(1);
    assert_eq!(deltas.version, 3);
    let ids: Vec<_> = deltas.domains.keys().map(|id| id.as_str().to_string()).collect();
    assert_eq!(ids, vec!["df_probe", "df_join"]);
}

#[tokio::test]
async fn acknowledged_version_never_regresses() {
    let harness = TaskHarness::create();
    harness.start().unwrap();
    harness.execution.publish_domain("df_build", Domain::All);

    for callers_version in [0, 1, 5, 100] {
        let result = harness.task.acknowledge_dynamic_filters(callers_version);
        assert!(result.version >= callers_version);
    }
}

#[tokio::test]
async fn empty_task_reports_the_initial_domains() {
    let harness = TaskHarness::create();
    let initial = harness.task.acknowledge_dynamic_filters(0);
    assert_eq!(initial, VersionedDomains::initial());
    assert_eq!(harness.task.status().dynamic_filters_version, 0);
}

#[tokio::test]
async fn frozen_domains_are_served_after_finalization() {
    let harness = TaskHarness::create();
    harness.start().unwrap();
    harness.execution.publish_domain("df_build", Domain::values([1.into()]));
    harness.execution.publish_domain("df_probe", Domain::values([2.into()]));
    harness.execution.publish_domain("df_join", Domain::values([3.into()]));

    harness.task.cancel();
    assert!(eventually(|| harness.done_count() == 1).await);

    // Every caller now sees the same frozen set at the frozen version
    for callers_version in [0, 1, 3, 50] {
        let frozen = harness.task.acknowledge_dynamic_filters(callers_version);
        assert_eq!(frozen.version, 3);
        assert_eq!(frozen.domains.len(), 3);
    }
    assert_eq!(harness.task.status().dynamic_filters_version, 3);
}

#[tokio::test]
async fn update_routes_consumed_domains_to_the_execution() {
    let harness = TaskHarness::create();
    let consumed = domains_at_version(4, &["df_from_other_stage"]);
    harness
        .task
        .update(
            &harness.session(),
            Some(test_fragment()),
            Vec::new(),
            OutputBufferSpec::single(OutputBufferId(0), 0),
            Some(consumed.clone()),
        )
        .unwrap();

    assert_eq!(harness.execution.consumed_domains(), vec![consumed]);
}
