// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dialer status` command implementation.
//!
//! Reads queue counts straight from the database, so it works whether or
//! not `serve` is running and needs no provider credentials.

use std::fmt::Write as _;
use std::io::IsTerminal;

use colored::Colorize;
use dialer_config::model::DialerConfig;
use dialer_core::DialerError;
use dialer_dispatch::{CapacityGate, QueueStats, queue_stats};

use crate::serve;

/// Run the `dialer status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(config: &DialerConfig, json: bool, plain: bool) -> Result<(), DialerError> {
    let storage = serve::open_storage(config).await?;
    let gate = CapacityGate::new(config.dispatch.max_concurrent);
    let stats = queue_stats(&*storage, &gate).await;
    storage.close().await?;
    let stats = stats?;

    if json {
        let rendered = serde_json::to_string_pretty(&stats)
            .map_err(|e| DialerError::Internal(format!("failed to encode status: {e}")))?;
        println!("{rendered}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print!("{}", render_stats(&stats, use_color));
    }
    Ok(())
}

fn render_stats(stats: &QueueStats, use_color: bool) -> String {
    let slots = stats.available_slots.to_string();
    let failed = stats.failed.to_string();
    let (slots, failed) = if use_color {
        let slots = if stats.available_slots > 0 {
            slots.green()
        } else {
            slots.yellow()
        };
        let failed = if stats.failed > 0 {
            failed.red()
        } else {
            failed.normal()
        };
        (slots.to_string(), failed.to_string())
    } else {
        (slots, failed)
    };

    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "  dialer status");
    let _ = writeln!(out, "  {}", "-".repeat(35));
    let _ = writeln!(out, "    Pending:     {}", stats.pending);
    let _ = writeln!(
        out,
        "    In progress: {} / {}",
        stats.in_progress, stats.max_concurrent
    );
    let _ = writeln!(out, "    Completed:   {}", stats.completed);
    let _ = writeln!(out, "    Failed:      {failed}");
    let _ = writeln!(out, "    Free slots:  {slots}");
    let _ = writeln!(out);
    out
}
