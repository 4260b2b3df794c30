// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invocation entrypoint: one bounded dispatch cycle per call.

use std::sync::Arc;
use std::time::Duration;

use dialer_config::model::DispatchConfig;
use dialer_core::types::DispatchSummary;
use dialer_core::{CallProvider, DialerError, StorageAdapter};
use futures::{StreamExt, future, stream};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::capacity::{CapacityGate, QueueStats, queue_stats};
use crate::dispatcher::Dispatcher;
use crate::retry::RequeuePolicy;
use crate::selector::Selector;

/// Runs dispatch cycles against one store and one provider.
///
/// Cycles in the same process never overlap: a call made while another is
/// running returns immediately with `message = "dispatch already running"`.
/// Cycles in different processes are kept under the cap by the guarded claim.
pub struct QueueProcessor {
    storage: Arc<dyn StorageAdapter>,
    gate: CapacityGate,
    selector: Selector,
    dispatcher: Dispatcher,
    requeue: RequeuePolicy,
    worker_concurrency: usize,
    running: Mutex<()>,
}

impl QueueProcessor {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        provider: Arc<dyn CallProvider>,
        config: &DispatchConfig,
        call_timeout: Duration,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            storage.clone(),
            provider,
            config.max_concurrent,
            call_timeout,
        );
        Self {
            storage,
            gate: CapacityGate::new(config.max_concurrent),
            selector: Selector,
            dispatcher,
            requeue: RequeuePolicy::from_config(&config.requeue),
            worker_concurrency: config.worker_concurrency.max(1),
            running: Mutex::new(()),
        }
    }

    pub fn gate(&self) -> &CapacityGate {
        &self.gate
    }

    /// Queue counts and free slots.
    pub async fn stats(&self) -> Result<QueueStats, DialerError> {
        queue_stats(&*self.storage, &self.gate).await
    }

    /// Run one dispatch cycle.
    ///
    /// Only invocation-level failures (the capacity count or the selection
    /// query) return `Err`; per-item failures are reported in the summary.
    pub async fn process_once(&self) -> Result<DispatchSummary, DialerError> {
        let Ok(_guard) = self.running.try_lock() else {
            let active = self.storage.count_in_progress().await?;
            debug!(active, "dispatch already running, skipping invocation");
            record_invocation("already_running");
            return Ok(DispatchSummary::already_running(active));
        };

        match self.run_cycle().await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!(error = %e, "dispatch invocation failed");
                record_invocation("error");
                Err(e)
            }
        }
    }

    async fn run_cycle(&self) -> Result<DispatchSummary, DialerError> {
        match self.requeue.apply(&*self.storage, chrono::Utc::now()).await {
            Ok(0) => {}
            Ok(moved) => info!(moved, "requeued failed items"),
            Err(e) => warn!(error = %e, "requeue of failed items failed"),
        }

        let capacity = self.gate.check(&*self.storage).await?;
        if capacity.is_exhausted() {
            debug!(active = capacity.active, "at capacity, nothing dispatched");
            record_invocation("at_capacity");
            set_active_calls(capacity.active);
            return Ok(DispatchSummary::at_capacity(capacity.active));
        }

        let items = self
            .selector
            .select(&*self.storage, capacity.available)
            .await?;
        if items.is_empty() {
            debug!(available = capacity.available, "no pending calls");
            record_invocation("no_pending");
            set_active_calls(capacity.active);
            return Ok(DispatchSummary::no_pending(capacity.active));
        }

        let selected = items.len();
        let workers = selected.min(self.worker_concurrency);
        debug!(
            selected,
            available = capacity.available,
            workers,
            "dispatching selected items"
        );

        // `buffered` starts futures in selection order and yields results in
        // that order; each item's failure stays inside its own future.
        // Items are moved into their futures so the cycle stays `Send`.
        let dispatcher = &self.dispatcher;
        let results: Vec<_> = stream::iter(items)
            .map(|item| async move { dispatcher.dispatch(&item).await })
            .buffered(workers)
            .filter_map(future::ready)
            .collect()
            .await;

        #[cfg(feature = "prometheus")]
        for result in &results {
            dialer_prometheus::record_dispatch(result.success);
        }

        let summary = DispatchSummary::dispatched(capacity.active, results);
        info!(
            processed = summary.processed,
            succeeded = summary.successes(),
            failed = summary.failures(),
            active_calls = summary.active_calls,
            "dispatch cycle complete"
        );
        record_invocation("dispatched");
        set_active_calls(summary.active_calls);
        Ok(summary)
    }
}

#[cfg(feature = "prometheus")]
fn record_invocation(outcome: &'static str) {
    dialer_prometheus::record_invocation(outcome);
}

#[cfg(not(feature = "prometheus"))]
fn record_invocation(_outcome: &'static str) {}

#[cfg(feature = "prometheus")]
fn set_active_calls(count: i64) {
    dialer_prometheus::set_active_calls(count);
}

#[cfg(not(feature = "prometheus"))]
fn set_active_calls(_count: i64) {}
