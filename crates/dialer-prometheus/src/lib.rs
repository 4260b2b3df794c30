// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus exporter for dispatch metrics.
//!
//! The dispatcher records through the `metrics` facade (see [`recording`]);
//! this crate installs the process-wide recorder and hands the gateway a
//! render callback for `GET /metrics`.

pub mod recording;

use std::sync::Arc;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use dialer_core::types::{AdapterType, HealthStatus};
use dialer_core::{DialerError, PluginAdapter};

pub use recording::{
    record_dispatch, record_invocation, record_provider_latency, register_metrics,
    set_active_calls,
};

/// Render callback shape expected by the gateway's `/metrics` route.
pub type RenderFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Owns the installed recorder's handle.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Install the recorder process-wide and describe the dispatch series.
    ///
    /// Fails if another recorder is already installed.
    pub fn new() -> Result<Self, DialerError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            DialerError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;
        recording::register_metrics();
        recording::set_active_calls(0);
        tracing::debug!("prometheus recorder installed");
        Ok(Self { handle })
    }

    /// Build from an existing handle, e.g. one from a local recorder.
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Current exposition text.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// A cloneable callback that renders the current exposition text.
    pub fn render_fn(&self) -> RenderFn {
        let handle = self.handle.clone();
        Arc::new(move || handle.render())
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, DialerError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DialerError> {
        Ok(())
    }
}
