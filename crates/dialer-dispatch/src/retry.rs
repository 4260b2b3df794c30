// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opt-in requeueing of failed items.
//!
//! Disabled by default, in which case `failed` is terminal and the policy
//! never touches the store.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dialer_config::model::RequeueConfig;
use dialer_core::types::format_timestamp;
use dialer_core::{DialerError, QueueStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequeuePolicy {
    pub enabled: bool,
    /// Minimum age of a failure before it is retried.
    pub cooldown: Duration,
    /// Items claimed this many times stay failed.
    pub max_attempts: i64,
}

impl RequeuePolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            cooldown: Duration::ZERO,
            max_attempts: 0,
        }
    }

    pub fn from_config(config: &RequeueConfig) -> Self {
        Self {
            enabled: config.enabled,
            cooldown: Duration::from_secs(config.cooldown_secs),
            max_attempts: config.max_attempts,
        }
    }

    /// Failures older than this instant are eligible at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let cooldown = chrono::Duration::from_std(self.cooldown).unwrap_or(chrono::Duration::MAX);
        now.checked_sub_signed(cooldown)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Move eligible failed items back to `pending`. Returns how many moved.
    pub async fn apply<S>(&self, store: &S, now: DateTime<Utc>) -> Result<u64, DialerError>
    where
        S: QueueStore + ?Sized,
    {
        if !self.enabled {
            return Ok(0);
        }
        let cutoff = format_timestamp(self.cutoff(now));
        store.requeue_failed(&cutoff, self.max_attempts).await
    }
}

impl Default for RequeuePolicy {
    fn default() -> Self {
        Self::disabled()
    }
}
