// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: positive capacities,
//! URL schemes, bind addresses. Collects every error instead of stopping at
//! the first.

use crate::diagnostic::ConfigError;
use crate::model::DialerConfig;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &DialerConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let dispatch = &config.dispatch;
    if dispatch.max_concurrent < 1 {
        fail(format!(
            "dispatch.max_concurrent must be at least 1, got {}",
            dispatch.max_concurrent
        ));
    }
    if dispatch.worker_concurrency < 1 {
        fail("dispatch.worker_concurrency must be at least 1, got 0".to_string());
    }
    if dispatch.poll_interval_secs == Some(0) {
        fail("dispatch.poll_interval_secs must be at least 1 when set".to_string());
    }
    if dispatch.requeue.enabled && dispatch.requeue.max_attempts < 1 {
        fail(format!(
            "dispatch.requeue.max_attempts must be at least 1, got {}",
            dispatch.requeue.max_attempts
        ));
    }

    if config.provider.timeout_secs == 0 {
        fail("provider.timeout_secs must be at least 1".to_string());
    }
    if let Some(url) = &config.provider.base_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        fail(format!(
            "provider.base_url `{url}` must start with http:// or https://"
        ));
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_ip && !is_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check the settings `serve` and `process` need to reach the provider.
///
/// Kept apart from [`validate_config`] so `status` works without provider credentials.
pub fn require_provider(config: &DialerConfig) -> Result<(), Vec<ConfigError>> {
    let mut missing = Vec::new();
    if config.provider.base_url.is_none() {
        missing.push(ConfigError::MissingKey {
            key: "provider.base_url".to_string(),
        });
    }
    if config.provider.api_key.is_none() {
        missing.push(ConfigError::MissingKey {
            key: "provider.api_key".to_string(),
        });
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}
