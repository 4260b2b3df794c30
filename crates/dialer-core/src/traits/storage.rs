// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits for the queue, its collaborators, and the backend lifecycle.
//!
//! The store traits are split by entity so tests can reason about which
//! table an operation touches. [`StorageAdapter`] bundles them for the
//! dispatcher, which needs all four.

use async_trait::async_trait;

use crate::error::DialerError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Agent, CallRecord, ClaimOutcome, Lead, QueueItem, QueueStatusCounts};

/// Durable queue of outbound-call requests.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Number of items currently `in_progress` across the whole table.
    async fn count_in_progress(&self) -> Result<i64, DialerError>;

    /// Up to `limit` pending items, highest priority first, then oldest first.
    async fn select_pending(&self, limit: i64) -> Result<Vec<QueueItem>, DialerError>;

    /// Atomically move an item from `pending` to `in_progress`.
    ///
    /// The status check, the global `in_progress` count against
    /// `max_concurrent`, and the update happen in one write transaction.
    async fn claim(
        &self,
        id: &str,
        max_concurrent: i64,
        now: &str,
    ) -> Result<ClaimOutcome, DialerError>;

    /// Terminate an item as `failed` with the given cause.
    async fn mark_failed(&self, id: &str, error: &str, now: &str) -> Result<(), DialerError>;

    /// Link an item to the call record created for it.
    async fn link_call(&self, id: &str, call_id: &str) -> Result<(), DialerError>;

    /// Insert a new item.
    async fn enqueue(&self, item: &QueueItem) -> Result<(), DialerError>;

    async fn get_queue_item(&self, id: &str) -> Result<Option<QueueItem>, DialerError>;

    async fn status_counts(&self) -> Result<QueueStatusCounts, DialerError>;

    /// Reset `failed` items that failed before `failed_before` and were claimed
    /// fewer than `max_attempts` times back to `pending`. Returns how many moved.
    async fn requeue_failed(
        &self,
        failed_before: &str,
        max_attempts: i64,
    ) -> Result<u64, DialerError>;
}

/// Lead lookup and the dispatcher's conditional lead update.
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn get_lead(&self, id: &str) -> Result<Option<Lead>, DialerError>;

    /// Stamp `last_call_at` and advance the stage from `new` to `contacted`.
    ///
    /// The stage write is compare-and-set: a lead already moved past `new`
    /// keeps its stage. Returns whether the stage advanced.
    async fn record_lead_contact(&self, id: &str, now: &str) -> Result<bool, DialerError>;

    async fn insert_lead(&self, lead: &Lead) -> Result<(), DialerError>;
}

/// Agent lookup.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, DialerError>;

    async fn insert_agent(&self, agent: &Agent) -> Result<(), DialerError>;
}

/// Call record creation and the dispatcher's reconcile write.
#[async_trait]
pub trait CallRecordStore: Send + Sync {
    async fn create_call_record(&self, record: &CallRecord) -> Result<(), DialerError>;

    /// Store the provider's execution handle and move the record to `queued`.
    async fn mark_call_queued(
        &self,
        id: &str,
        external_call_id: Option<&str>,
        now: &str,
    ) -> Result<(), DialerError>;

    async fn get_call_record(&self, id: &str) -> Result<Option<CallRecord>, DialerError>;
}

/// A complete persistence backend.
///
/// Storage adapters manage the lifecycle of the database connection and
/// expose every store the dispatcher writes to.
#[async_trait]
pub trait StorageAdapter:
    PluginAdapter + QueueStore + LeadStore + AgentStore + CallRecordStore
{
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), DialerError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), DialerError>;
}
