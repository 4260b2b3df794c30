// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dialer serve` command implementation.
//!
//! Wires storage, the call provider, the queue processor, the optional
//! built-in poller and the HTTP trigger, then runs until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use dialer_config::model::DialerConfig;
use dialer_core::{DialerError, StorageAdapter};
use dialer_dispatch::{QueuePoller, QueueProcessor};
use dialer_provider::HttpCallProvider;
use dialer_storage::SqliteStorage;
use tracing::{error, info, warn};

use crate::shutdown;

/// Run the `dialer serve` command.
pub async fn run_serve(config: DialerConfig) -> Result<(), DialerError> {
    init_tracing(&config.log_level);
    info!(version = env!("CARGO_PKG_VERSION"), "starting dialer");

    #[cfg(feature = "prometheus")]
    let prometheus_adapter = match dialer_prometheus::PrometheusAdapter::new() {
        Ok(adapter) => {
            info!("prometheus metrics enabled");
            Some(adapter)
        }
        Err(e) => {
            warn!(error = %e, "prometheus initialization failed, continuing without metrics");
            None
        }
    };

    #[cfg(feature = "prometheus")]
    let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> = prometheus_adapter
        .as_ref()
        .map(dialer_prometheus::PrometheusAdapter::render_fn);
    #[cfg(not(feature = "prometheus"))]
    let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> = None;

    let storage = open_storage(&config).await?;
    let processor = build_processor(&config, storage.clone())?;
    let cancel = shutdown::install_signal_handler();

    let poller = config.dispatch.poll_interval_secs.map(|secs| {
        info!(interval_secs = secs, "built-in poller enabled");
        QueuePoller::new(processor.clone(), Duration::from_secs(secs)).spawn(cancel.clone())
    });

    let served = if config.gateway.enabled {
        run_gateway(&config, processor, &cancel, prometheus_render).await
    } else {
        if poller.is_none() {
            warn!("gateway disabled and no poll interval set; nothing will trigger dispatch");
        }
        cancel.cancelled().await;
        Ok(())
    };

    if let Err(e) = &served {
        error!(error = %e, "gateway failed, shutting down");
        cancel.cancel();
    }

    if let Some(handle) = poller {
        if let Err(e) = handle.await {
            warn!(error = %e, "poller task ended abnormally");
        }
    }

    storage.close().await?;
    info!("dialer stopped");
    served
}

#[cfg(feature = "gateway")]
async fn run_gateway(
    config: &DialerConfig,
    processor: Arc<QueueProcessor>,
    cancel: &tokio_util::sync::CancellationToken,
    prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
) -> Result<(), DialerError> {
    use dialer_gateway::{AuthConfig, GatewayState, HealthState, ServerConfig};

    if config.gateway.bearer_token.is_none() {
        warn!("gateway.bearer_token is not set; trigger routes will reject every request");
    }
    let state = GatewayState {
        processor,
        auth: AuthConfig {
            bearer_token: config.gateway.bearer_token.clone(),
        },
        health: HealthState::new(prometheus_render),
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };
    dialer_gateway::start_server(&server_config, state, cancel.clone()).await
}

#[cfg(not(feature = "gateway"))]
async fn run_gateway(
    _config: &DialerConfig,
    _processor: Arc<QueueProcessor>,
    cancel: &tokio_util::sync::CancellationToken,
    _prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
) -> Result<(), DialerError> {
    warn!("gateway enabled in config but not compiled in (missing `gateway` feature)");
    cancel.cancelled().await;
    Ok(())
}

/// Open the configured SQLite database, running migrations.
pub(crate) async fn open_storage(
    config: &DialerConfig,
) -> Result<Arc<dyn StorageAdapter>, DialerError> {
    let storage: Arc<dyn StorageAdapter> = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    info!(path = %config.storage.database_path, "storage ready");
    Ok(storage)
}

/// Build the invocation entrypoint over `storage` and the HTTP provider.
pub(crate) fn build_processor(
    config: &DialerConfig,
    storage: Arc<dyn StorageAdapter>,
) -> Result<Arc<QueueProcessor>, DialerError> {
    let provider = Arc::new(HttpCallProvider::from_config(&config.provider)?);
    Ok(Arc::new(QueueProcessor::new(
        storage,
        provider,
        &config.dispatch,
        Duration::from_secs(config.provider.timeout_secs),
    )))
}

/// Initialize tracing with `RUST_LOG`, falling back to the configured level.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dialer={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
