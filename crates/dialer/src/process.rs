// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dialer process` command implementation.
//!
//! Runs exactly one dispatch cycle (the manual "process now" action) and
//! prints the resulting summary.

use std::fmt::Write as _;
use std::io::IsTerminal;

use colored::Colorize;
use dialer_config::model::DialerConfig;
use dialer_core::DialerError;
use dialer_core::types::DispatchSummary;
use tracing::warn;

use crate::serve;

/// Run the `dialer process` command.
pub async fn run_process(config: &DialerConfig, json: bool) -> Result<(), DialerError> {
    serve::init_tracing(&config.log_level);

    let storage = serve::open_storage(config).await?;
    let outcome = match serve::build_processor(config, storage.clone()) {
        Ok(processor) => processor.process_once().await,
        Err(e) => Err(e),
    };
    if let Err(e) = storage.close().await {
        warn!(error = %e, "storage close failed");
    }
    let summary = outcome?;

    if json {
        let rendered = serde_json::to_string_pretty(&summary)
            .map_err(|e| DialerError::Internal(format!("failed to encode summary: {e}")))?;
        println!("{rendered}");
    } else {
        print!("{}", render_summary(&summary, std::io::stdout().is_terminal()));
    }
    Ok(())
}

/// Human-readable summary of one dispatch cycle.
pub(crate) fn render_summary(summary: &DispatchSummary, use_color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "  dialer process");
    let _ = writeln!(out, "  {}", "-".repeat(35));

    if let Some(message) = &summary.message {
        let _ = writeln!(out, "    {message}");
    } else {
        let _ = writeln!(
            out,
            "    Processed: {} ({} ok, {} failed)",
            summary.processed,
            summary.successes(),
            summary.failures()
        );
    }
    let _ = writeln!(out, "    Active:    {}", summary.active_calls);

    for result in &summary.results {
        let mark = match (result.success, use_color) {
            (true, true) => "ok".green().to_string(),
            (false, true) => "FAIL".red().to_string(),
            (true, false) => "[OK]".to_string(),
            (false, false) => "[FAIL]".to_string(),
        };
        let detail = if result.success {
            result.execution_id.as_deref().unwrap_or("no execution id")
        } else {
            result.error.as_deref().unwrap_or("unknown error")
        };
        let _ = writeln!(out, "      {mark} {} {detail}", result.queue_item_id);
    }
    let _ = writeln!(out);
    out
}
