//! End-to-end linking tests: webhook payload in, links and domain events out.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    create_payload, labeled_payload, merged_pull_request_payload, pull_request_payload,
    review_payload, Harness, PREFIX, REPO_URL,
};
use prlink::domain::models::{LabelRule, PrState, RecordKind};
use prlink::domain::ports::RecordRepository;
use prlink::services::{DispatcherConfig, EventDispatcher, LabelReactor};

#[tokio::test]
async fn test_pull_request_event_end_to_end() {
    common::setup_test_logging();
    let (_dir, mut harness) = Harness::sqlite().await;
    let record = harness.seed(RecordKind::Feature, "PROJ-9").await;

    let outcome = harness
        .orchestrator
        .handle_webhook(
            "pull_request",
            pull_request_payload("opened", "Implements PROJ-9", 42, Some("feature-x")),
        )
        .await
        .unwrap();

    assert_eq!(outcome.records_linked, vec![record.clone()]);
    assert_eq!(outcome.events_emitted, 1);

    let prs = harness.links.pull_requests(&record).await.unwrap();
    assert_eq!(prs.len(), 1);
    assert_eq!(prs[0].id, 42);
    assert_eq!(prs[0].state, PrState::Open);
    assert_eq!(prs[0].url, format!("{REPO_URL}/pull/42"));

    let branches = harness.links.branches(&record).await.unwrap();
    assert_eq!(branches.len(), 1);
    assert_eq!(branches[0].name, "feature-x");
    assert_eq!(branches[0].url, format!("{REPO_URL}/tree/feature-x"));

    let account = harness.links.all_prs().await.unwrap();
    assert_eq!(account.len(), 1);
    assert_eq!(account[0].id, "42PROJ-9");
    assert_eq!(
        account[0].record_reference,
        ("Feature".to_string(), "PROJ-9".to_string())
    );

    let events = harness.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, format!("{PREFIX}.pr.opened"));
    assert_eq!(events[0].record.as_ref(), Some(&record));
}

#[tokio::test]
async fn test_relinking_reflects_latest_state() {
    let (_dir, harness) = Harness::sqlite().await;
    let record = harness.seed(RecordKind::Feature, "PROJ-9").await;

    harness
        .orchestrator
        .handle_webhook("pull_request", pull_request_payload("opened", "PROJ-9 work", 42, None))
        .await
        .unwrap();
    harness
        .orchestrator
        .handle_webhook("pull_request", merged_pull_request_payload("PROJ-9 work", 42))
        .await
        .unwrap();

    let prs = harness.links.pull_requests(&record).await.unwrap();
    assert_eq!(prs.len(), 1);
    assert_eq!(prs[0].state, PrState::Merged);
    assert_eq!(harness.links.all_prs().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_one_pr_two_records_gets_two_account_entries() {
    let (_dir, mut harness) = Harness::sqlite().await;
    let first = harness.seed(RecordKind::Feature, "PROJ-1").await;
    let second = harness.seed(RecordKind::Feature, "PROJ-2").await;

    let outcome = harness
        .orchestrator
        .handle_webhook(
            "pull_request",
            pull_request_payload("opened", "PROJ-1 and PROJ-2", 5, None),
        )
        .await
        .unwrap();
    assert_eq!(outcome.records_linked, vec![first.clone(), second.clone()]);

    let mut ids: Vec<String> = harness
        .links
        .all_prs()
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["5PROJ-1".to_string(), "5PROJ-2".to_string()]);

    assert_eq!(harness.links.pull_requests(&first).await.unwrap().len(), 1);
    assert_eq!(harness.links.pull_requests(&second).await.unwrap().len(), 1);
    assert_eq!(harness.drain_events().len(), 2);
}

#[tokio::test]
async fn test_unlink_removes_only_the_target() {
    let (_dir, harness) = Harness::sqlite().await;
    let record = harness.seed(RecordKind::Feature, "PROJ-1").await;

    for number in [1, 2] {
        harness
            .orchestrator
            .handle_webhook("pull_request", pull_request_payload("opened", "PROJ-1", number, None))
            .await
            .unwrap();
    }

    harness.links.unlink_pull_request(&record, 1).await.unwrap();

    let prs = harness.links.pull_requests(&record).await.unwrap();
    assert_eq!(prs.iter().map(|pr| pr.id).collect::<Vec<_>>(), vec![2]);

    // Regression: the account entry for the unlinked PR must be removed,
    // and the other entry kept.
    let account = harness.links.all_prs().await.unwrap();
    assert_eq!(
        account.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
        vec!["2PROJ-1"]
    );
}

#[tokio::test]
async fn test_unlink_all_clears_record_and_account_entries() {
    let (_dir, harness) = Harness::sqlite().await;
    let archived = harness.seed(RecordKind::Feature, "PROJ-1").await;
    let other = harness.seed(RecordKind::Feature, "PROJ-2").await;

    harness
        .orchestrator
        .handle_webhook(
            "pull_request",
            pull_request_payload("opened", "PROJ-1", 1, Some("PROJ-1-branch")),
        )
        .await
        .unwrap();
    harness
        .orchestrator
        .handle_webhook("pull_request", pull_request_payload("opened", "PROJ-2", 2, None))
        .await
        .unwrap();

    harness.links.unlink_pull_requests(&archived).await.unwrap();
    harness.links.unlink_branches(&archived).await.unwrap();

    assert!(harness.links.pull_requests(&archived).await.unwrap().is_empty());
    assert!(harness.links.branches(&archived).await.unwrap().is_empty());
    assert_eq!(harness.links.pull_requests(&other).await.unwrap().len(), 1);

    let account = harness.links.all_prs().await.unwrap();
    assert_eq!(account.len(), 1);
    assert_eq!(account[0].id, "2PROJ-2");
}

#[tokio::test]
async fn test_branch_creation_links_every_record() {
    let (_dir, mut harness) = Harness::sqlite().await;
    let first = harness.seed(RecordKind::Feature, "PROJ-3").await;
    let second = harness.seed(RecordKind::Feature, "PROJ-4").await;

    let outcome = harness
        .orchestrator
        .handle_webhook("create", create_payload("branch", "PROJ-3-PROJ-4-shared"))
        .await
        .unwrap();
    assert_eq!(outcome.records_linked.len(), 2);

    for record in [&first, &second] {
        let branches = harness.links.branches(record).await.unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].id, "PROJ-3-PROJ-4-shared");
    }

    let events = harness.drain_events();
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|event| event.name == format!("{PREFIX}.create.created")));
}

#[tokio::test]
async fn test_tag_creation_has_no_effect() {
    let (_dir, mut harness) = Harness::sqlite().await;
    let record = harness.seed(RecordKind::Feature, "PROJ-3").await;

    let outcome = harness
        .orchestrator
        .handle_webhook("create", create_payload("tag", "PROJ-3"))
        .await
        .unwrap();

    assert!(outcome.ignored);
    assert!(harness.links.branches(&record).await.unwrap().is_empty());
    assert!(harness.drain_events().is_empty());
}

#[tokio::test]
async fn test_unresolved_title_emits_single_recordless_event() {
    let mut harness = Harness::in_memory();

    let outcome = harness
        .orchestrator
        .handle_webhook("pull_request", pull_request_payload("opened", "refactor cleanup", 3, None))
        .await
        .unwrap();
    assert!(outcome.records_linked.is_empty());

    let events = harness.drain_events();
    assert_eq!(events.len(), 1);
    assert!(events[0].record.is_none());
    assert!(harness.links.all_prs().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_record_is_skipped_but_others_link() {
    let mut harness = Harness::in_memory();
    let known = harness.seed(RecordKind::Feature, "PROJ-1").await;

    let outcome = harness
        .orchestrator
        .handle_webhook(
            "pull_request",
            pull_request_payload("opened", "PROJ-1 PROJ-404", 8, None),
        )
        .await
        .unwrap();

    assert_eq!(outcome.records_linked, vec![known]);
    assert_eq!(harness.drain_events().len(), 1);
}

#[tokio::test]
async fn test_review_event_emits_without_linking() {
    let mut harness = Harness::in_memory();
    let record = harness.seed(RecordKind::Epic, "PROJ-E-2").await;

    let outcome = harness
        .orchestrator
        .handle_webhook("pull_request_review", review_payload("submitted", "PROJ-E-2 rollout"))
        .await
        .unwrap();
    assert!(outcome.records_linked.is_empty());
    assert_eq!(outcome.events_emitted, 1);

    let events = harness.drain_events();
    assert_eq!(events[0].name, format!("{PREFIX}.pull_request_review.submitted"));
    assert_eq!(events[0].record.as_ref(), Some(&record));
    assert!(harness.links.pull_requests(&record).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_labeled_pull_request_updates_workflow_status() {
    let (_dir, harness) = Harness::sqlite().await;
    harness.seed(RecordKind::Feature, "PROJ-7").await;

    let dispatcher = EventDispatcher::new(harness.event_bus.clone(), DispatcherConfig::default());
    dispatcher
        .register(Arc::new(LabelReactor::new(
            harness.records.clone(),
            vec![LabelRule {
                label: "documentation".to_string(),
                workflow_status: "Will not implement".to_string(),
            }],
            PREFIX,
        )))
        .await;
    let handle = dispatcher.start();

    harness
        .orchestrator
        .handle_webhook("pull_request", labeled_payload("PROJ-7 docs", 11, "documentation"))
        .await
        .unwrap();

    let mut status = None;
    for _ in 0..50 {
        status = harness
            .records
            .get(RecordKind::Feature, "PROJ-7")
            .await
            .unwrap()
            .and_then(|record| record.workflow_status);
        if status.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(status.as_deref(), Some("Will not implement"));

    dispatcher.stop();
    handle.await.unwrap();
    assert_eq!(dispatcher.events_processed(), 1);
}
