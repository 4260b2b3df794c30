// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the dispatch pipeline.
//!
//! Each test creates an isolated TestHarness with a temp SQLite file and a
//! mock call provider. Tests are independent and order-insensitive.

use std::sync::Arc;
use std::time::Duration;

use dialer_config::model::DispatchConfig;
use dialer_core::types::{QueueStatus, format_timestamp, lead_stage};
use dialer_dispatch::QueueProcessor;
use dialer_test_utils::TestHarness;
use proptest::prelude::*;

fn processor(harness: &TestHarness, max_concurrent: i64) -> QueueProcessor {
    let config = DispatchConfig {
        max_concurrent,
        ..DispatchConfig::default()
    };
    QueueProcessor::new(
        harness.storage(),
        harness.provider(),
        &config,
        Duration::from_secs(5),
    )
}

// ---- Capacity invariant ----

#[tokio::test]
async fn overlapping_processors_never_exceed_cap() {
    let harness = TestHarness::new().await.unwrap();
    let agent = harness.seed_agent("a").await.unwrap();
    for i in 0..12 {
        let lead = harness
            .seed_lead(&format!("lead-{i}"), lead_stage::NEW)
            .await
            .unwrap();
        harness.enqueue(&lead, &agent, i % 4).await.unwrap();
    }

    // Separate processors do not share the in-process guard, so only the
    // guarded claim keeps them under the cap.
    let processors: Vec<_> = (0..4).map(|_| Arc::new(processor(&harness, 5))).collect();
    for _ in 0..3 {
        let runs = processors.iter().map(|p| {
            let p = p.clone();
            async move { p.process_once().await }
        });
        let summaries = spawn_all(runs).await;
        for summary in summaries {
            assert!(summary.unwrap().success);
        }
        assert!(harness.in_progress().await.unwrap() <= 5);
    }

    assert_eq!(harness.in_progress().await.unwrap(), 5);
    assert_eq!(harness.mock_provider().call_count().await, 5);
}

async fn spawn_all<F, T>(futures: impl Iterator<Item = F>) -> Vec<T>
where
    F: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handles: Vec<_> = futures.map(tokio::spawn).collect();
    let mut out = Vec::with_capacity(handles.len());
    for handle in handles {
        out.push(handle.await.unwrap());
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn in_progress_never_exceeds_cap(
        max_concurrent in 1i64..6,
        busy in 0usize..6,
        pending in 0usize..10,
        invocations in 1usize..4,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let harness = TestHarness::new().await.unwrap();
            let busy = busy.min(max_concurrent as usize);
            harness.seed_in_progress(busy).await.unwrap();
            let agent = harness.seed_agent("a").await.unwrap();
            for i in 0..pending {
                let lead = harness.seed_lead(&format!("l{i}"), lead_stage::NEW).await.unwrap();
                harness.enqueue(&lead, &agent, 0).await.unwrap();
            }

            let processor = processor(&harness, max_concurrent);
            for _ in 0..invocations {
                processor.process_once().await.unwrap();
                assert!(harness.in_progress().await.unwrap() <= max_concurrent);
            }
            let expected = (busy + pending).min(max_concurrent as usize) as i64;
            assert_eq!(harness.in_progress().await.unwrap(), expected);
        });
    }
}

// ---- Admission order ----

#[tokio::test]
async fn admits_highest_priority_then_oldest() {
    let harness = TestHarness::new().await.unwrap();
    let agent = harness.seed_agent("a").await.unwrap();
    let base = chrono::Utc::now() - chrono::Duration::minutes(10);

    let mut items = Vec::new();
    for (i, priority) in [1, 5, 3].into_iter().enumerate() {
        let lead = harness
            .seed_lead(&format!("p{priority}"), lead_stage::NEW)
            .await
            .unwrap();
        let queued_at = format_timestamp(base + chrono::Duration::seconds(i as i64));
        items.push(
            harness
                .enqueue_at(&lead, &agent, priority, &queued_at)
                .await
                .unwrap(),
        );
    }

    let summary = processor(&harness, 2).process_once().await.unwrap();

    let order: Vec<&str> = summary
        .results
        .iter()
        .map(|r| r.queue_item_id.as_str())
        .collect();
    assert_eq!(order, vec![items[1].id.as_str(), items[2].id.as_str()]);
    assert_eq!(
        harness.queue_item(&items[0].id).await.unwrap().status,
        QueueStatus::Pending
    );
}

// ---- Fail-closed on missing reference ----

#[tokio::test]
async fn deleted_lead_fails_without_provider_call() {
    let harness = TestHarness::new().await.unwrap();
    let agent = harness.seed_agent("a").await.unwrap();
    let lead = harness.seed_lead("Gone", lead_stage::NEW).await.unwrap();
    let item = harness.enqueue(&lead, &agent, 0).await.unwrap();
    harness.delete_lead(&lead.id).await.unwrap();

    let summary = processor(&harness, 10).process_once().await.unwrap();

    assert_eq!(summary.processed, 1);
    assert!(!summary.results[0].success);
    let stored = harness.queue_item(&item.id).await.unwrap();
    assert_eq!(stored.status, QueueStatus::Failed);
    assert!(!stored.error_message.unwrap_or_default().is_empty());
    assert!(stored.completed_at.is_some());
    assert_eq!(harness.mock_provider().call_count().await, 0);
}

// ---- Provider failure isolation ----

#[tokio::test]
async fn provider_500_is_isolated_to_its_item() {
    let harness = TestHarness::new().await.unwrap();
    let agent = harness.seed_agent("a").await.unwrap();
    let mut items = Vec::new();
    let mut leads = Vec::new();
    for priority in [3, 2, 1] {
        let lead = harness
            .seed_lead(&format!("p{priority}"), lead_stage::NEW)
            .await
            .unwrap();
        items.push(harness.enqueue(&lead, &agent, priority).await.unwrap());
        leads.push(lead);
    }
    harness
        .mock_provider()
        .fail_for_lead(&leads[1].id, 500, "upstream exploded")
        .await;

    let summary = processor(&harness, 10).process_once().await.unwrap();

    assert_eq!(summary.processed, 3);
    let outcomes: Vec<bool> = summary.results.iter().map(|r| r.success).collect();
    assert_eq!(outcomes, vec![true, false, true]);
    let error = summary.results[1].error.as_deref().unwrap();
    assert!(error.contains("500"), "{error}");
    assert!(error.contains("upstream exploded"), "{error}");
    assert_eq!(summary.active_calls, 2);

    assert_eq!(
        harness.queue_item(&items[1].id).await.unwrap().status,
        QueueStatus::Failed
    );
    for i in [0, 2] {
        let stored = harness.queue_item(&items[i].id).await.unwrap();
        assert_eq!(stored.status, QueueStatus::InProgress);
        assert!(stored.call_id.is_some());
    }
    assert_eq!(harness.mock_provider().call_count().await, 3);
}

// ---- Conditional lead advance ----

#[tokio::test]
async fn lead_stage_advances_only_from_new() {
    let harness = TestHarness::new().await.unwrap();
    let agent = harness.seed_agent("a").await.unwrap();
    let fresh = harness.seed_lead("Fresh", lead_stage::NEW).await.unwrap();
    let contacted = harness
        .seed_lead("Known", lead_stage::CONTACTED)
        .await
        .unwrap();
    harness.enqueue(&fresh, &agent, 0).await.unwrap();
    harness.enqueue(&contacted, &agent, 0).await.unwrap();

    let summary = processor(&harness, 10).process_once().await.unwrap();
    assert_eq!(summary.successes(), 2);

    let fresh = harness.lead(&fresh.id).await.unwrap();
    assert_eq!(fresh.stage, lead_stage::CONTACTED);
    assert!(fresh.last_call_at.is_some());

    let contacted = harness.lead(&contacted.id).await.unwrap();
    assert_eq!(contacted.stage, lead_stage::CONTACTED);
}

// ---- Idempotent empty cycle ----

#[tokio::test]
async fn empty_queue_twice_writes_nothing() {
    let harness = TestHarness::new().await.unwrap();
    let processor = processor(&harness, 10);

    for _ in 0..2 {
        let summary = processor.process_once().await.unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.message.as_deref(), Some("no pending calls"));
    }
    assert_eq!(harness.instrumented().writes(), 0);
}

// ---- No-slots fast path ----

#[tokio::test]
async fn full_capacity_skips_queue_reads() {
    let harness = TestHarness::new().await.unwrap();
    harness.seed_in_progress(3).await.unwrap();
    let agent = harness.seed_agent("a").await.unwrap();
    let lead = harness.seed_lead("Waiting", lead_stage::NEW).await.unwrap();
    harness.enqueue(&lead, &agent, 9).await.unwrap();

    let summary = processor(&harness, 3).process_once().await.unwrap();

    assert_eq!(summary.processed, 0);
    assert_eq!(summary.active_calls, 3);
    assert_eq!(summary.message.as_deref(), Some("at capacity"));
    assert_eq!(harness.instrumented().count("count_in_progress"), 1);
    assert_eq!(harness.instrumented().queue_reads(), 0);
    assert_eq!(harness.instrumented().writes(), 0);
    assert_eq!(harness.mock_provider().call_count().await, 0);
}
