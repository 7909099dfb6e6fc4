//! rambling-sw - command-line host for the rambling cache router.
//!
//! Drives the router's lifecycle against a live origin, keeping the
//! versioned caches on disk so they survive between runs.

mod commands;

use std::io;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Command;

/// Directory for rotating log files; stderr only when unset.
const LOG_DIR_ENV: &str = "RAMBLING_LOG_DIR";

/// Log file name prefix inside the log directory
const LOG_FILE_NAME: &str = "rambling-sw.log";

const USAGE: &str = "\
Usage: rambling-sw <command>

Commands:
  activate                 Install and activate the configured version
  start                    Request page status and seed missing manifest URLs
  seed [--force]           Pre-cache the manifest (--force overwrites entries)
  fetch <path> [method]    Route a request network-first with cache fallback
  caches                   List cache stores and their entries
  purge                    Delete stores left by other versions
  status <online> <logged-in>
                           Deliver a status update (true/false values)
  message <json>           Deliver a message and print the resulting status
  config [--save]          Show the effective configuration

Environment:
  RAMBLING_ORIGIN, RAMBLING_VERSION override the config file.
  RUST_LOG sets the log filter (default: warn).
  RAMBLING_LOG_DIR also writes logs to a daily rotated file.";

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Some(command) => command,
        None => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    let _guard = init_tracing();
    info!(?command, "rambling-sw starting");

    commands::run(command).await
}
