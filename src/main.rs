//! PaperHub entry point.
//!
//! Loads configuration, initialises logging and runs the selected command.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use paperhub_core::config::AppConfig;
use paperhub_core::config::logging::{LogFormat, LoggingConfig};

mod app;
mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.env)
        .with_context(|| format!("Failed to load configuration (env: {})", cli.env))?;

    init_logging(&config.logging);

    cli.execute(config).await
}

/// Initialize tracing/logging
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = fmt().with_env_filter(filter).with_target(true);
    match config.format {
        LogFormat::Json => builder.json().with_thread_ids(true).init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}
