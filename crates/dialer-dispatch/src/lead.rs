// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort lead update after a call is placed.

use dialer_core::LeadStore;
use tracing::{debug, warn};

/// Stamps `last_call_at` and moves `new` leads to `contacted`.
///
/// Never fails the dispatch: errors are logged and reported as "not advanced".
#[derive(Debug, Clone, Copy, Default)]
pub struct LeadStateUpdater;

impl LeadStateUpdater {
    /// Returns whether the lead's stage moved from `new` to `contacted`.
    pub async fn record_contact<S>(&self, store: &S, lead_id: &str, now: &str) -> bool
    where
        S: LeadStore + ?Sized,
    {
        match store.record_lead_contact(lead_id, now).await {
            Ok(advanced) => {
                debug!(lead_id, advanced, "lead contact recorded");
                advanced
            }
            Err(e) => {
                warn!(lead_id, error = %e, "failed to update lead after call");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialer_core::types::{lead_stage, now_timestamp};
    use dialer_test_utils::TestHarness;

    #[tokio::test]
    async fn advances_new_lead_only() {
        let harness = TestHarness::new().await.unwrap();
        let fresh = harness.seed_lead("Ada", lead_stage::NEW).await.unwrap();
        let contacted = harness.seed_lead("Bo", lead_stage::CONTACTED).await.unwrap();
        let now = now_timestamp();

        assert!(LeadStateUpdater.record_contact(&*harness.storage(), &fresh.id, &now).await);
        assert!(!LeadStateUpdater.record_contact(&*harness.storage(), &contacted.id, &now).await);

        let contacted = harness.lead(&contacted.id).await.unwrap();
        assert_eq!(contacted.stage, lead_stage::CONTACTED);
        assert_eq!(contacted.last_call_at.as_deref(), Some(now.as_str()));
    }

    #[tokio::test]
    async fn store_errors_are_swallowed() {
        let harness = TestHarness::new().await.unwrap();
        let lead = harness.seed_lead("Ada", lead_stage::NEW).await.unwrap();
        harness.instrumented().fail_operation("record_lead_contact");

        let advanced = LeadStateUpdater
            .record_contact(&*harness.storage(), &lead.id, &now_timestamp())
            .await;
        assert!(!advanced);
        assert_eq!(harness.lead(&lead.id).await.unwrap().stage, lead_stage::NEW);
    }
}
