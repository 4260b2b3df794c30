// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity and lifecycle shared by the dialer's backends.

use async_trait::async_trait;

use crate::error::DialerError;
use crate::types::{AdapterType, HealthStatus};

/// Common surface of the SQLite store, the HTTP call provider and the
/// Prometheus exporter.
///
/// [`StorageAdapter`](crate::StorageAdapter) and
/// [`CallProvider`](crate::CallProvider) both require it, so test doubles
/// that stand in for either implement it too.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Short backend name used in logs, e.g. `"sqlite"`.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    /// `Unhealthy` carries a reason; `Err` means the check itself could not run.
    async fn health_check(&self) -> Result<HealthStatus, DialerError>;

    /// Flush pending state before the process exits. The store checkpoints
    /// its WAL here; stateless backends return `Ok(())`.
    async fn shutdown(&self) -> Result<(), DialerError>;
}
