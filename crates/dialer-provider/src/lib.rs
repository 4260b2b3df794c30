// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call provider adapter for the dialer.
//!
//! Wraps [`ProviderClient`] in the [`CallProvider`] trait so the dispatcher
//! can place calls without knowing about HTTP.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use dialer_config::model::ProviderConfig;
use dialer_core::types::{CallHandle, CallRequest};
use dialer_core::{AdapterType, CallProvider, DialerError, HealthStatus, PluginAdapter};
use tracing::info;

pub use client::ProviderClient;

/// [`CallProvider`] backed by the provider's HTTP API.
pub struct HttpCallProvider {
    client: ProviderClient,
}

impl HttpCallProvider {
    /// Build the provider from configuration.
    ///
    /// Fails with [`DialerError::Config`] when the base URL or API key is missing.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, DialerError> {
        let base_url = non_empty(&config.base_url).ok_or_else(|| {
            DialerError::Config("provider.base_url is required to place calls".into())
        })?;
        let api_key = non_empty(&config.api_key).ok_or_else(|| {
            DialerError::Config(
                "provider.api_key is required to place calls (set DIALER_PROVIDER_API_KEY)".into(),
            )
        })?;

        let client =
            ProviderClient::new(base_url, api_key, Duration::from_secs(config.timeout_secs))?;
        info!(base_url = client.base_url(), "call provider initialized");
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: ProviderClient) -> Self {
        Self { client }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[async_trait]
impl PluginAdapter for HttpCallProvider {
    fn name(&self) -> &str {
        "http-call-provider"
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
impl CallProvider for HttpCallProvider {
    async fn make_call(&self, request: &CallRequest) -> Result<CallHandle, DialerError> {
        self.client.make_call(request).await
    }
}
