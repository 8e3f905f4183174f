//! farewatch - a terminal client for flight price alerts.
//!
//! Sign in, search flights, and get a local notification when a fare drops
//! below the price you are watching for.

mod commands;
mod notifier;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use farewatch_core::api::ApiError;
use farewatch_core::config::Config;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{AlertAction, App, Cli, Command};

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "farewatch.log";

/// Initialize the tracing subscriber for logging.
///
/// Use RUST_LOG to control the level (e.g., RUST_LOG=debug). When a log
/// directory is available, everything is also written to a daily file there.
fn init_tracing(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
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
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: failed to load config ({}), using defaults", e);
        Config::default()
    });

    let _log_guard = init_tracing(config.cache_dir().ok().map(|dir| dir.join("logs")));

    let command = cli.command;
    let signing_in = matches!(command, Command::Login { .. } | Command::Register { .. });
    info!(command = command_label(&command), "farewatch starting");
    let app = App::new(config).await?;
    let result = app.run(command).await;

    if let Err(ref e) = result {
        if !signing_in && e.downcast_ref::<ApiError>().is_some_and(ApiError::is_unauthorized) {
            warn!("Backend rejected the stored session");
            eprintln!("Your session has expired. Run `farewatch login` to sign in again.");
        }
    }
    result
}

fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Login { .. } => "login",
        Command::Register { .. } => "register",
        Command::Logout => "logout",
        Command::Whoami => "whoami",
        Command::Search { .. } => "search",
        Command::Alerts { action: None | Some(AlertAction::List) } => "alerts list",
        Command::Alerts { action: Some(AlertAction::Add { .. }) } => "alerts add",
        Command::Alerts { action: Some(AlertAction::Rm { .. }) } => "alerts rm",
        Command::Alerts { action: Some(AlertAction::Test { .. }) } => "alerts test",
        Command::History => "history",
        Command::Predict { .. } => "predict",
    }
}
