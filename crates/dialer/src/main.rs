// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! dialer - capacity-gated outbound call-queue dispatcher.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod process;
mod serve;
mod shutdown;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dialer_config::DialerConfig;

/// dialer - capacity-gated outbound call-queue dispatcher.
#[derive(Parser, Debug)]
#[command(name = "dialer", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the default lookup.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP trigger and the optional built-in poller.
    Serve,
    /// Run one dispatch cycle now and print its summary.
    Process {
        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show queue counts and free capacity.
    Status {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => dialer_config::load_and_validate_path(path),
        None => dialer_config::load_and_validate(),
    };
    let config = loaded.unwrap_or_else(|errors| exit_with_config_errors(&errors));

    let result = match cli.command {
        Commands::Serve => {
            require_provider(&config);
            serve::run_serve(config).await
        }
        Commands::Process { json } => {
            require_provider(&config);
            process::run_process(&config, json).await
        }
        Commands::Status { json, plain } => status::run_status(&config, json, plain).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn require_provider(config: &DialerConfig) {
    if let Err(errors) = dialer_config::require_provider(config) {
        exit_with_config_errors(&errors);
    }
}

fn exit_with_config_errors(errors: &[dialer_config::ConfigError]) -> ! {
    dialer_config::render_errors(errors);
    std::process::exit(1);
}
