// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in trigger that runs a dispatch cycle on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::processor::QueueProcessor;

pub struct QueuePoller {
    processor: Arc<QueueProcessor>,
    interval: Duration,
}

impl QueuePoller {
    pub fn new(processor: Arc<QueueProcessor>, interval: Duration) -> Self {
        Self {
            processor,
            interval,
        }
    }

    /// Run the poller on the current runtime until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Poll until cancelled. The first cycle runs immediately.
    ///
    /// A cycle that outlasts the interval delays the next tick instead of
    /// bursting to catch up. Cycle errors are logged and polling continues.
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "queue poller started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.processor.process_once().await {
                        Ok(summary) if summary.processed > 0 => {
                            debug!(processed = summary.processed, "poll cycle dispatched items");
                        }
                        Ok(summary) => {
                            debug!(message = summary.message.as_deref().unwrap_or(""), "poll cycle idle");
                        }
                        Err(e) => {
                            warn!(error = %e, "poll cycle failed (non-fatal)");
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("queue poller shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialer_config::model::DispatchConfig;
    use dialer_core::types::lead_stage;
    use dialer_test_utils::TestHarness;

    #[tokio::test]
    async fn polls_until_cancelled() {
        let harness = TestHarness::new().await.unwrap();
        let agent = harness.seed_agent("sales").await.unwrap();
        let lead = harness.seed_lead("Ada", lead_stage::NEW).await.unwrap();
        harness.enqueue(&lead, &agent, 0).await.unwrap();

        let processor = Arc::new(QueueProcessor::new(
            harness.storage(),
            harness.provider(),
            &DispatchConfig::default(),
            Duration::from_secs(5),
        ));
        let cancel = CancellationToken::new();
        let handle =
            QueuePoller::new(processor, Duration::from_millis(20)).spawn(cancel.clone());

        tokio::time::sleep(Duration::from_millis(120)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(harness.mock_provider().call_count().await, 1);
        assert!(harness.instrumented().count("count_in_progress") >= 2);
    }

    #[tokio::test]
    async fn stops_promptly_when_already_cancelled() {
        let harness = TestHarness::new().await.unwrap();
        let processor = Arc::new(QueueProcessor::new(
            harness.storage(),
            harness.provider(),
            &DispatchConfig::default(),
            Duration::from_secs(5),
        ));
        let cancel = CancellationToken::new();
        cancel.cancel();

        tokio::time::timeout(
            Duration::from_secs(1),
            QueuePoller::new(processor, Duration::from_secs(3600)).run(cancel),
        )
        .await
        .unwrap();
    }
}
