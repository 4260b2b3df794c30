// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call-counting storage decorator.
//!
//! `InstrumentedStorage` forwards every operation to an inner adapter and
//! counts it by name, so tests can assert which queries an invocation issued.
//! Individual operations can be made to fail to exercise error paths.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use dialer_core::types::{
    AdapterType, Agent, CallRecord, ClaimOutcome, HealthStatus, Lead, QueueItem,
    QueueStatusCounts,
};
use dialer_core::{
    AgentStore, CallRecordStore, DialerError, LeadStore, PluginAdapter, QueueStore,
    StorageAdapter,
};

/// Operations that modify the database.
pub const WRITE_OPERATIONS: &[&str] = &[
    "claim",
    "mark_failed",
    "link_call",
    "enqueue",
    "requeue_failed",
    "record_lead_contact",
    "insert_lead",
    "insert_agent",
    "create_call_record",
    "mark_call_queued",
];

/// Reads against the queue table other than the capacity count.
pub const QUEUE_READ_OPERATIONS: &[&str] = &["select_pending", "get_queue_item", "status_counts"];

pub struct InstrumentedStorage {
    inner: Arc<dyn StorageAdapter>,
    counts: Mutex<HashMap<&'static str, usize>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl InstrumentedStorage {
    pub fn new(inner: Arc<dyn StorageAdapter>) -> Self {
        Self {
            inner,
            counts: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// How many times `operation` was invoked.
    pub fn count(&self, operation: &str) -> usize {
        self.counts
            .lock()
            .map(|c| c.get(operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total invocations of [`WRITE_OPERATIONS`].
    pub fn writes(&self) -> usize {
        WRITE_OPERATIONS.iter().map(|op| self.count(op)).sum()
    }

    /// Total invocations of [`QUEUE_READ_OPERATIONS`].
    pub fn queue_reads(&self) -> usize {
        QUEUE_READ_OPERATIONS.iter().map(|op| self.count(op)).sum()
    }

    /// Every operation invoked so far, with its count.
    pub fn snapshot(&self) -> HashMap<&'static str, usize> {
        self.counts.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn reset(&self) {
        if let Ok(mut counts) = self.counts.lock() {
            counts.clear();
        }
    }

    /// Make every later call to `operation` fail with a storage error.
    pub fn fail_operation(&self, operation: &'static str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(operation);
        }
    }

    pub fn heal_operation(&self, operation: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.remove(operation);
        }
    }

    fn track(&self, operation: &'static str) -> Result<(), DialerError> {
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(operation).or_insert(0) += 1;
        }
        let failing = self
            .failing
            .lock()
            .map(|f| f.contains(operation))
            .unwrap_or(false);
        if failing {
            return Err(DialerError::Storage {
                source: format!("injected failure in {operation}").into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for InstrumentedStorage {
    fn name(&self) -> &str {
        "instrumented"
    }

    fn version(&self) -> semver::Version {
        self.inner.version()
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, DialerError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), DialerError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl StorageAdapter for InstrumentedStorage {
    async fn initialize(&self) -> Result<(), DialerError> {
        self.inner.initialize().await
    }

    async fn close(&self) -> Result<(), DialerError> {
        self.inner.close().await
    }
}

#[async_trait]
impl QueueStore for InstrumentedStorage {
    async fn count_in_progress(&self) -> Result<i64, DialerError> {
        self.track("count_in_progress")?;
        self.inner.count_in_progress().await
    }

    async fn select_pending(&self, limit: i64) -> Result<Vec<QueueItem>, DialerError> {
        self.track("select_pending")?;
        self.inner.select_pending(limit).await
    }

    async fn claim(
        &self,
        id: &str,
        max_concurrent: i64,
        now: &str,
    ) -> Result<ClaimOutcome, DialerError> {
        self.track("claim")?;
        self.inner.claim(id, max_concurrent, now).await
    }

    async fn mark_failed(&self, id: &str, error: &str, now: &str) -> Result<(), DialerError> {
        self.track("mark_failed")?;
        self.inner.mark_failed(id, error, now).await
    }

    async fn link_call(&self, id: &str, call_id: &str) -> Result<(), DialerError> {
        self.track("link_call")?;
        self.inner.link_call(id, call_id).await
    }

    async fn enqueue(&self, item: &QueueItem) -> Result<(), DialerError> {
        self.track("enqueue")?;
        self.inner.enqueue(item).await
    }

    async fn get_queue_item(&self, id: &str) -> Result<Option<QueueItem>, DialerError> {
        self.track("get_queue_item")?;
        self.inner.get_queue_item(id).await
    }

    async fn status_counts(&self) -> Result<QueueStatusCounts, DialerError> {
        self.track("status_counts")?;
        self.inner.status_counts().await
    }

    async fn requeue_failed(
        &self,
        failed_before: &str,
        max_attempts: i64,
    ) -> Result<u64, DialerError> {
        self.track("requeue_failed")?;
        self.inner.requeue_failed(failed_before, max_attempts).await
    }
}

#[async_trait]
impl LeadStore for InstrumentedStorage {
    async fn get_lead(&self, id: &str) -> Result<Option<Lead>, DialerError> {
        self.track("get_lead")?;
        self.inner.get_lead(id).await
    }

    async fn record_lead_contact(&self, id: &str, now: &str) -> Result<bool, DialerError> {
        self.track("record_lead_contact")?;
        self.inner.record_lead_contact(id, now).await
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<(), DialerError> {
        self.track("insert_lead")?;
        self.inner.insert_lead(lead).await
    }
}

#[async_trait]
impl AgentStore for InstrumentedStorage {
    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, DialerError> {
        self.track("get_agent")?;
        self.inner.get_agent(id).await
    }

    async fn insert_agent(&self, agent: &Agent) -> Result<(), DialerError> {
        self.track("insert_agent")?;
        self.inner.insert_agent(agent).await
    }
}

#[async_trait]
impl CallRecordStore for InstrumentedStorage {
    async fn create_call_record(&self, record: &CallRecord) -> Result<(), DialerError> {
        self.track("create_call_record")?;
        self.inner.create_call_record(record).await
    }

    async fn mark_call_queued(
        &self,
        id: &str,
        external_call_id: Option<&str>,
        now: &str,
    ) -> Result<(), DialerError> {
        self.track("mark_call_queued")?;
        self.inner.mark_call_queued(id, external_call_id, now).await
    }

    async fn get_call_record(&self, id: &str) -> Result<Option<CallRecord>, DialerError> {
        self.track("get_call_record")?;
        self.inner.get_call_record(id).await
    }
}
