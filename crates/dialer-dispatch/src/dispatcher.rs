// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-item dispatch state machine.
//!
//! Each admitted item is claimed, resolved, recorded locally, sent to the
//! call provider, reconciled, linked, and finally used to advance its lead.
//! Any failure after the claim terminates that item as `failed`; it never
//! affects sibling items.

use std::sync::Arc;
use std::time::Duration;

use dialer_core::types::{
    Agent, CallRecord, CallRequest, CallUserData, ClaimOutcome, DispatchResult, Lead, QueueItem,
    now_timestamp,
};
use dialer_core::{CallProvider, DialerError, StorageAdapter};
use tracing::{debug, error, info, warn};

use crate::lead::LeadStateUpdater;

/// Everything the provider call needs, loaded before any external side effect.
struct Prepared {
    lead: Lead,
    agent: Agent,
    record: CallRecord,
}

/// Drives one queue item at a time through the dispatch steps.
pub struct Dispatcher {
    storage: Arc<dyn StorageAdapter>,
    provider: Arc<dyn CallProvider>,
    lead_updater: LeadStateUpdater,
    max_concurrent: i64,
    call_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        provider: Arc<dyn CallProvider>,
        max_concurrent: i64,
        call_timeout: Duration,
    ) -> Self {
        Self {
            storage,
            provider,
            lead_updater: LeadStateUpdater,
            max_concurrent,
            call_timeout,
        }
    }

    /// Drive `item` to its outcome.
    ///
    /// Returns `None` when the claim was refused (another dispatcher owns the
    /// item, or the global cap was reached in the meantime). Such items stay
    /// `pending` and are not reported.
    pub async fn dispatch(&self, item: &QueueItem) -> Option<DispatchResult> {
        match self
            .storage
            .claim(&item.id, self.max_concurrent, &now_timestamp())
            .await
        {
            Ok(ClaimOutcome::Claimed) => {}
            Ok(outcome) => {
                debug!(queue_item_id = %item.id, ?outcome, "claim refused, skipping item");
                return None;
            }
            Err(e) => {
                // Nothing was claimed, so the item is still pending.
                warn!(queue_item_id = %item.id, error = %e, "claim failed");
                return Some(DispatchResult::failed(&item.id, None, e.to_string()));
            }
        }

        let prepared = match self.prepare(item).await {
            Ok(prepared) => prepared,
            Err(e) => return Some(self.fail(item, None, e).await),
        };
        let call_id = prepared.record.id.clone();

        match self.place_call(item, &prepared).await {
            Ok(execution_id) => {
                let now = now_timestamp();
                self.lead_updater
                    .record_contact(&*self.storage, &prepared.lead.id, &now)
                    .await;
                info!(
                    queue_item_id = %item.id,
                    call_id = %call_id,
                    execution_id = execution_id.as_deref().unwrap_or(""),
                    "call dispatched"
                );
                Some(DispatchResult::succeeded(&item.id, call_id, execution_id))
            }
            Err(e) => Some(self.fail(item, Some(call_id), e).await),
        }
    }

    /// Resolve lead and agent, then write the `initiating` call record.
    ///
    /// Nothing external has happened if this fails.
    async fn prepare(&self, item: &QueueItem) -> Result<Prepared, DialerError> {
        let lead = self
            .storage
            .get_lead(&item.lead_id)
            .await?
            .ok_or_else(|| DialerError::NotFound {
                entity: "lead",
                id: item.lead_id.clone(),
            })?;
        let agent = self
            .storage
            .get_agent(&item.agent_id)
            .await?
            .ok_or_else(|| DialerError::NotFound {
                entity: "agent",
                id: item.agent_id.clone(),
            })?;

        let record = CallRecord::initiating(item);
        self.storage.create_call_record(&record).await?;
        debug!(queue_item_id = %item.id, call_id = %record.id, "call record created");

        Ok(Prepared {
            lead,
            agent,
            record,
        })
    }

    /// Call the provider, reconcile the returned handle, link the item.
    async fn place_call(
        &self,
        item: &QueueItem,
        prepared: &Prepared,
    ) -> Result<Option<String>, DialerError> {
        let request = CallRequest {
            external_agent_id: prepared.agent.external_agent_id.clone(),
            recipient_phone_number: prepared.lead.phone_number.clone(),
            user_data: CallUserData {
                lead_id: prepared.lead.id.clone(),
                lead_name: prepared.lead.name.clone(),
                call_id: prepared.record.id.clone(),
                queue_item_id: item.id.clone(),
            },
        };

        #[cfg(feature = "prometheus")]
        let started = std::time::Instant::now();

        let handle = tokio::time::timeout(self.call_timeout, self.provider.make_call(&request))
            .await
            .map_err(|_| DialerError::Timeout {
                duration: self.call_timeout,
            })??;

        #[cfg(feature = "prometheus")]
        dialer_prometheus::record_provider_latency(started.elapsed().as_secs_f64());

        if handle.execution_id.is_none() {
            warn!(
                queue_item_id = %item.id,
                call_id = %prepared.record.id,
                "provider accepted call without an execution id"
            );
        }

        self.storage
            .mark_call_queued(
                &prepared.record.id,
                handle.execution_id.as_deref(),
                &now_timestamp(),
            )
            .await?;
        self.storage.link_call(&item.id, &prepared.record.id).await?;

        Ok(handle.execution_id)
    }

    /// Record `cause` on the item and build its failed result.
    async fn fail(
        &self,
        item: &QueueItem,
        call_id: Option<String>,
        cause: DialerError,
    ) -> DispatchResult {
        let message = cause.to_string();
        warn!(
            queue_item_id = %item.id,
            call_id = call_id.as_deref().unwrap_or(""),
            error = %message,
            "dispatch failed"
        );
        if let Err(e) = self
            .storage
            .mark_failed(&item.id, &message, &now_timestamp())
            .await
        {
            error!(
                queue_item_id = %item.id,
                error = %e,
                "failed to record dispatch failure"
            );
        }
        DispatchResult::failed(&item.id, call_id, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialer_core::types::{CallStatus, QueueStatus, lead_stage};
    use dialer_core::{CallRecordStore, QueueStore};
    use dialer_test_utils::{MockCallProvider, TestHarness};

    fn dispatcher(harness: &TestHarness) -> Dispatcher {
        Dispatcher::new(
            harness.storage(),
            harness.provider(),
            10,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn success_walks_every_step() {
        let harness = TestHarness::new().await.unwrap();
        let agent = harness.seed_agent("sales").await.unwrap();
        let lead = harness.seed_lead("Ada", lead_stage::NEW).await.unwrap();
        let item = harness.enqueue(&lead, &agent, 0).await.unwrap();

        let result = dispatcher(&harness).dispatch(&item).await.unwrap();
        assert!(result.success, "{result:?}");
        assert_eq!(result.execution_id.as_deref(), Some("exec-1"));
        let call_id = result.call_id.clone().unwrap();

        let stored = harness.queue_item(&item.id).await.unwrap();
        assert_eq!(stored.status, QueueStatus::InProgress);
        assert_eq!(stored.call_id.as_deref(), Some(call_id.as_str()));
        assert!(stored.started_at.is_some());

        let record = harness.sqlite().get_call_record(&call_id).await.unwrap().unwrap();
        assert_eq!(record.status, CallStatus::Queued);
        assert_eq!(record.external_call_id.as_deref(), Some("exec-1"));
        assert_eq!(record.metadata["queueItemId"], item.id.as_str());

        let calls = harness.mock_provider().calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].external_agent_id, "ext-sales");
        assert_eq!(calls[0].user_data.call_id, call_id);
        assert_eq!(calls[0].user_data.lead_name, "Ada");

        assert_eq!(harness.lead(&lead.id).await.unwrap().stage, lead_stage::CONTACTED);
    }

    #[tokio::test]
    async fn missing_agent_fails_without_provider_call() {
        let harness = TestHarness::new().await.unwrap();
        let lead = harness.seed_lead("Ada", lead_stage::NEW).await.unwrap();
        let item = QueueItem::pending("client-1", &lead.id, "no-such-agent", 0);
        harness.sqlite().enqueue(&item).await.unwrap();

        let result = dispatcher(&harness).dispatch(&item).await.unwrap();
        assert!(!result.success);
        assert!(result.call_id.is_none());
        assert!(result.error.as_deref().unwrap().contains("agent not found"));
        assert_eq!(harness.mock_provider().call_count().await, 0);
        assert_eq!(harness.instrumented().count("create_call_record"), 0);

        let stored = harness.queue_item(&item.id).await.unwrap();
        assert_eq!(stored.status, QueueStatus::Failed);
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn call_record_failure_blocks_provider_call() {
        let harness = TestHarness::new().await.unwrap();
        let agent = harness.seed_agent("sales").await.unwrap();
        let lead = harness.seed_lead("Ada", lead_stage::NEW).await.unwrap();
        let item = harness.enqueue(&lead, &agent, 0).await.unwrap();
        harness.instrumented().fail_operation("create_call_record");

        let result = dispatcher(&harness).dispatch(&item).await.unwrap();
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("injected failure"));
        assert_eq!(harness.mock_provider().call_count().await, 0);
        assert_eq!(
            harness.queue_item(&item.id).await.unwrap().status,
            QueueStatus::Failed
        );
    }

    #[tokio::test]
    async fn provider_error_keeps_call_record_reference() {
        let provider = MockCallProvider::new();
        let harness = TestHarness::with_provider(provider).await.unwrap();
        let agent = harness.seed_agent("sales").await.unwrap();
        let lead = harness.seed_lead("Ada", lead_stage::NEW).await.unwrap();
        harness
            .mock_provider()
            .fail_for_lead(&lead.id, 500, "upstream exploded")
            .await;
        let item = harness.enqueue(&lead, &agent, 0).await.unwrap();

        let result = dispatcher(&harness).dispatch(&item).await.unwrap();
        assert!(!result.success);
        assert!(result.call_id.is_some());
        let error = result.error.unwrap();
        assert!(error.contains("500") && error.contains("upstream exploded"), "{error}");

        let stored = harness.queue_item(&item.id).await.unwrap();
        assert_eq!(stored.status, QueueStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some(error.as_str()));
        assert!(stored.call_id.is_none());
        assert_eq!(harness.lead(&lead.id).await.unwrap().stage, lead_stage::NEW);
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let provider = MockCallProvider::new().with_delay(Duration::from_millis(500));
        let harness = TestHarness::with_provider(provider).await.unwrap();
        let agent = harness.seed_agent("sales").await.unwrap();
        let lead = harness.seed_lead("Ada", lead_stage::NEW).await.unwrap();
        let item = harness.enqueue(&lead, &agent, 0).await.unwrap();

        let dispatcher = Dispatcher::new(
            harness.storage(),
            harness.provider(),
            10,
            Duration::from_millis(20),
        );
        let result = dispatcher.dispatch(&item).await.unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn missing_execution_id_still_succeeds() {
        let provider = MockCallProvider::new().without_execution_id();
        let harness = TestHarness::with_provider(provider).await.unwrap();
        let agent = harness.seed_agent("sales").await.unwrap();
        let lead = harness.seed_lead("Ada", lead_stage::NEW).await.unwrap();
        let item = harness.enqueue(&lead, &agent, 0).await.unwrap();

        let result = dispatcher(&harness).dispatch(&item).await.unwrap();
        assert!(result.success);
        assert!(result.execution_id.is_none());

        let record = harness
            .sqlite()
            .get_call_record(result.call_id.as_deref().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, CallStatus::Queued);
        assert!(record.external_call_id.is_none());
    }

    #[tokio::test]
    async fn already_claimed_item_is_skipped() {
        let harness = TestHarness::new().await.unwrap();
        let agent = harness.seed_agent("sales").await.unwrap();
        let lead = harness.seed_lead("Ada", lead_stage::NEW).await.unwrap();
        let item = harness.enqueue(&lead, &agent, 0).await.unwrap();

        let dispatcher = dispatcher(&harness);
        assert!(dispatcher.dispatch(&item).await.is_some());
        assert!(dispatcher.dispatch(&item).await.is_none());
        assert_eq!(harness.mock_provider().call_count().await, 1);
    }

    #[tokio::test]
    async fn claim_at_capacity_is_skipped() {
        let harness = TestHarness::new().await.unwrap();
        harness.seed_in_progress(1).await.unwrap();
        let agent = harness.seed_agent("sales").await.unwrap();
        let lead = harness.seed_lead("Ada", lead_stage::NEW).await.unwrap();
        let item = harness.enqueue(&lead, &agent, 0).await.unwrap();

        let dispatcher =
            Dispatcher::new(harness.storage(), harness.provider(), 1, Duration::from_secs(5));
        assert!(dispatcher.dispatch(&item).await.is_none());
        assert_eq!(
            harness.queue_item(&item.id).await.unwrap().status,
            QueueStatus::Pending
        );
    }

    #[tokio::test]
    async fn lead_update_failure_does_not_fail_dispatch() {
        let harness = TestHarness::new().await.unwrap();
        let agent = harness.seed_agent("sales").await.unwrap();
        let lead = harness.seed_lead("Ada", lead_stage::NEW).await.unwrap();
        let item = harness.enqueue(&lead, &agent, 0).await.unwrap();
        harness.instrumented().fail_operation("record_lead_contact");

        let result = dispatcher(&harness).dispatch(&item).await.unwrap();
        assert!(result.success);
        assert_eq!(
            harness.queue_item(&item.id).await.unwrap().status,
            QueueStatus::InProgress
        );
    }

    #[tokio::test]
    async fn failure_to_record_failure_reports_original_cause() {
        let harness = TestHarness::new().await.unwrap();
        let agent = harness.seed_agent("sales").await.unwrap();
        let lead = harness.seed_lead("Ada", lead_stage::NEW).await.unwrap();
        let item = harness.enqueue(&lead, &agent, 0).await.unwrap();
        harness.delete_lead(&lead.id).await.unwrap();
        harness.instrumented().fail_operation("mark_failed");

        let result = dispatcher(&harness).dispatch(&item).await.unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("lead not found"));
    }
}
