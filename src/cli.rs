//! Command-line interface.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use paperhub_core::config::AppConfig;
use paperhub_database::DatabasePool;
use paperhub_entity::summary::SummaryStyle;
use paperhub_worker::{
    AiClient, DispatchWorker, HttpAiClient, MaintenanceScheduler, MaintenanceTask,
    ReconcileJobsTask, UploadSweepTask,
};

use crate::app::App;

/// PaperHub: PDF document lifecycle and summarization
#[derive(Debug, Parser)]
#[command(name = "paperhub", version, about, long_about = None)]
pub struct Cli {
    /// Configuration overlay to load on top of config/default.toml
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the dispatch worker and the maintenance scheduler
    Run,
    /// Apply pending database migrations
    Migrate,
    /// Remove abandoned presigned uploads once
    SweepUploads,
    /// Fail summarization jobs that never called back
    ReconcileJobs,
    /// List the supported summary styles
    Styles,
}

impl Cli {
    /// Execute the selected command.
    pub async fn execute(&self, config: AppConfig) -> anyhow::Result<()> {
        match self.command {
            Commands::Run => run(config).await,
            Commands::Migrate => migrate(config).await,
            Commands::SweepUploads => {
                let (app, _rx) = App::build(config).await?;
                run_once(&UploadSweepTask::new(app.uploads.clone())).await
            }
            Commands::ReconcileJobs => {
                let (app, _rx) = App::build(config).await?;
                let task = ReconcileJobsTask::new(
                    app.summaries.clone(),
                    app.config.worker.job_timeout_minutes,
                );
                run_once(&task).await
            }
            Commands::Styles => {
                let styles = SummaryStyle::catalog();
                println!("{}", serde_json::to_string_pretty(&styles)?);
                Ok(())
            }
        }
    }
}

async fn run_once(task: &dyn MaintenanceTask) -> anyhow::Result<()> {
    let report = task
        .run(Utc::now())
        .await
        .with_context(|| format!("{} failed", task.name()))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn migrate(config: AppConfig) -> anyhow::Result<()> {
    let pool = DatabasePool::connect(&config.database).await?;
    paperhub_database::migration::run_migrations(pool.pool()).await?;
    pool.close().await;
    Ok(())
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting PaperHub v{}", env!("CARGO_PKG_VERSION"));
    let (app, rx) = App::build(config).await?;
    let worker_config = app.config.worker.clone();

    let (cancel_tx, cancel_rx) = watch::channel(false);

    let dispatch = if worker_config.enabled {
        let client = HttpAiClient::new(&app.config.ai)?;
        if !client.health().await {
            warn!(base_url = %app.config.ai.base_url, "AI worker is not answering its health check");
        }
        let worker = DispatchWorker::new(
            rx,
            Arc::new(client),
            app.summaries.clone(),
            worker_config.clone(),
        );
        Some(tokio::spawn(worker.run(cancel_rx)))
    } else {
        warn!("Dispatch worker disabled; summary requests will be rejected");
        drop(rx);
        None
    };

    let mut scheduler = MaintenanceScheduler::new().await?;
    scheduler
        .register_default_tasks(
            &worker_config,
            Arc::new(UploadSweepTask::new(app.uploads.clone())),
            Arc::new(ReconcileJobsTask::new(
                app.summaries.clone(),
                worker_config.job_timeout_minutes,
            )),
        )
        .await?;
    scheduler.start().await?;

    info!("PaperHub running, press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    let _ = cancel_tx.send(true);
    scheduler.shutdown().await?;
    if let Some(handle) = dispatch {
        handle.await.context("Dispatch worker panicked")?;
    }
    if let Some(pool) = &app.pool {
        pool.close().await;
    }

    info!("PaperHub stopped");
    Ok(())
}
