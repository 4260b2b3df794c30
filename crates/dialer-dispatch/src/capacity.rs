// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Global admission limit on concurrently active calls.

use dialer_core::{DialerError, QueueStore};
use serde::Serialize;

/// Snapshot of provider capacity at the start of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    /// Items `in_progress` when the gate was checked.
    pub active: i64,
    /// `max_concurrent - active`. Zero or negative means no new calls may start.
    pub available: i64,
}

impl Capacity {
    pub fn is_exhausted(&self) -> bool {
        self.available <= 0
    }
}

/// Computes how many new calls may start this cycle.
#[derive(Debug, Clone, Copy)]
pub struct CapacityGate {
    max_concurrent: i64,
}

impl CapacityGate {
    pub fn new(max_concurrent: i64) -> Self {
        Self { max_concurrent }
    }

    pub fn max_concurrent(&self) -> i64 {
        self.max_concurrent
    }

    /// Read the `in_progress` count. A failed read is fatal for the invocation.
    pub async fn check<S>(&self, store: &S) -> Result<Capacity, DialerError>
    where
        S: QueueStore + ?Sized,
    {
        let active = store.count_in_progress().await?;
        Ok(Capacity {
            active,
            available: self.max_concurrent - active,
        })
    }
}

/// Queue counts plus capacity, as served by `/queue/stats` and `dialer status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub failed: i64,
    pub max_concurrent: i64,
    pub available_slots: i64,
}

/// Collect [`QueueStats`] for the given gate.
pub async fn queue_stats<S>(store: &S, gate: &CapacityGate) -> Result<QueueStats, DialerError>
where
    S: QueueStore + ?Sized,
{
    let counts = store.status_counts().await?;
    Ok(QueueStats {
        pending: counts.pending,
        in_progress: counts.in_progress,
        completed: counts.completed,
        failed: counts.failed,
        max_concurrent: gate.max_concurrent(),
        available_slots: (gate.max_concurrent() - counts.in_progress).max(0),
    })
}
