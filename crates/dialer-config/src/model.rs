// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is a
//! startup error rather than a silently ignored setting.

use serde::{Deserialize, Serialize};

/// Top-level dialer configuration.
///
/// Every section is optional and falls back to its defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DialerConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Admission control and dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// External call provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// HTTP trigger surface settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            storage: StorageConfig::default(),
            dispatch: DispatchConfig::default(),
            provider: ProviderConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("dialer").join("dialer.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("dialer.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Admission control configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Global cap on simultaneously `in_progress` queue items.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: i64,

    /// Upper bound on provider calls in flight within one invocation.
    /// `1` processes admitted items strictly one after another.
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Built-in poll interval for `serve`. `None` means external trigger only.
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,

    /// Automatic requeue of failed items.
    #[serde(default)]
    pub requeue: RequeueConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            worker_concurrency: default_worker_concurrency(),
            poll_interval_secs: None,
            requeue: RequeueConfig::default(),
        }
    }
}

fn default_max_concurrent() -> i64 {
    10
}

fn default_worker_concurrency() -> usize {
    5
}

/// Requeue policy for failed queue items. Disabled by default: failures are terminal.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RequeueConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Minimum age of a failure, in seconds, before it is retried.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Items claimed this many times stay failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,
}

impl Default for RequeueConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cooldown_secs: default_cooldown_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_cooldown_secs() -> u64 {
    300
}

fn default_max_attempts() -> i64 {
    3
}

/// External call provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Base URL of the provider API, e.g. `https://api.provider.example`.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer API key. Usually supplied via `DIALER_PROVIDER_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// HTTP trigger surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Start the HTTP server in `serve`.
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on trigger routes. `None` rejects every request.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}
