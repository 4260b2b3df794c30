// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock call provider for deterministic testing.
//!
//! `MockCallProvider` implements `CallProvider` without any network. Every
//! request is captured; failures are scripted per lead so the outcome does
//! not depend on which worker reaches the provider first.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use dialer_core::types::{AdapterType, CallHandle, CallRequest, HealthStatus};
use dialer_core::{CallProvider, DialerError, PluginAdapter};

/// A scripted failure returned for one lead.
#[derive(Debug, Clone)]
struct ScriptedFailure {
    status: u16,
    body: String,
}

/// A call provider that accepts every call unless told otherwise.
///
/// Accepted calls get execution ids `exec-1`, `exec-2`, ... in arrival order.
pub struct MockCallProvider {
    calls: Arc<Mutex<Vec<CallRequest>>>,
    failures: Arc<Mutex<HashMap<String, ScriptedFailure>>>,
    delay: Option<Duration>,
    return_execution_id: bool,
    next_id: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockCallProvider {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            delay: None,
            return_execution_id: true,
            next_id: AtomicU64::new(1),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Hold every call for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer 2xx without any identifier in the body.
    pub fn without_execution_id(mut self) -> Self {
        self.return_execution_id = false;
        self
    }

    /// Answer calls for `lead_id` with a non-2xx status and body.
    pub async fn fail_for_lead(&self, lead_id: &str, status: u16, body: &str) {
        self.failures.lock().await.insert(
            lead_id.to_string(),
            ScriptedFailure {
                status,
                body: body.to_string(),
            },
        );
    }

    /// Every request received so far, in arrival order.
    pub async fn calls(&self) -> Vec<CallRequest> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Highest number of calls that were in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for MockCallProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter even when the call future is dropped by a timeout.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PluginAdapter for MockCallProvider {
    fn name(&self) -> &str {
        "mock-call-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::CallProvider
    }

    async fn health_check(&self) -> Result<HealthStatus, DialerError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DialerError> {
        Ok(())
    }
}

#[async_trait]
impl CallProvider for MockCallProvider {
    async fn make_call(&self, request: &CallRequest) -> Result<CallHandle, DialerError> {
        self.calls.lock().await.push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self
            .failures
            .lock()
            .await
            .get(&request.user_data.lead_id)
            .cloned();
        if let Some(f) = failure {
            return Err(DialerError::provider(
                format!("call provider returned {}: {}", f.status, f.body),
                Some(f.status),
            ));
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(CallHandle {
            execution_id: self.return_execution_id.then(|| format!("exec-{n}")),
        })
    }
}
