// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./dialer.toml` > `~/.config/dialer/dialer.toml` > `/etc/dialer/dialer.toml`,
//! with environment variable overrides via the `DIALER_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::DialerConfig;

/// File name looked up in the working directory and XDG config directory.
pub const CONFIG_FILE_NAME: &str = "dialer.toml";

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/dialer/dialer.toml";

/// Env key prefixes (after `DIALER_` is stripped) and the dotted section they map to.
///
/// Longest prefixes first so `dispatch_requeue_*` is not swallowed by `dispatch_*`.
const ENV_SECTIONS: &[(&str, &str)] = &[
    ("dispatch_requeue_", "dispatch.requeue."),
    ("dispatch_", "dispatch."),
    ("storage_", "storage."),
    ("provider_", "provider."),
    ("gateway_", "gateway."),
];

/// Path of the per-user configuration file, if a config dir exists.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("dialer").join(CONFIG_FILE_NAME))
}

/// Build the layered Figment without extracting it.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/dialer/dialer.toml`
/// 3. `~/.config/dialer/dialer.toml`
/// 4. `./dialer.toml`
/// 5. `DIALER_*` environment variables
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(DialerConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(CONFIG_FILE_NAME))
        .merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<DialerConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<DialerConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DialerConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file, still honoring env overrides.
pub fn load_config_from_path(path: &Path) -> Result<DialerConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DialerConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Map a lowercased, prefix-stripped env key to its dotted config path.
///
/// Uses an explicit table instead of `Env::split("_")` because key names contain
/// underscores: `DIALER_PROVIDER_API_KEY` must become `provider.api_key`.
fn map_env_key(key: &str) -> String {
    for (prefix, section) in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(prefix) {
            return format!("{section}{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    // figment keeps the variable's case; the section table is lowercase.
    Env::prefixed("DIALER_")
        .map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}
