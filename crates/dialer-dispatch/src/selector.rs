// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Picks which pending items to admit.

use dialer_core::types::QueueItem;
use dialer_core::{DialerError, QueueStore};

/// Returns pending items by priority (desc), then queue time (asc).
#[derive(Debug, Clone, Copy, Default)]
pub struct Selector;

impl Selector {
    /// Up to `limit` pending items. `limit <= 0` returns nothing without a query.
    pub async fn select<S>(&self, store: &S, limit: i64) -> Result<Vec<QueueItem>, DialerError>
    where
        S: QueueStore + ?Sized,
    {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        store.select_pending(limit).await
    }
}
