//! taskmirror - task lifecycle tracker
//!
//! CLI entry point for running the registry daemon and inspecting the
//! task store.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use taskmirror::broker::MemoryBroker;
use taskmirror::cli::{Cli, Command, OutputFormat};
use taskmirror::config::Config;
use taskmirror::registry::TaskRegistry;
use taskmirror::store::{SqliteStore, TaskStore};

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskmirror")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Setup tracing subscriber - write to log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("taskmirror.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Command::Run) => cmd_run(&config).await,
        Some(Command::List { format }) => cmd_list(&config, format),
        None => cmd_list(&config, OutputFormat::Text),
    }
}

/// Run the registry daemon in the foreground until Ctrl-C
async fn cmd_run(config: &Config) -> Result<()> {
    let db_path = config.storage.database_path();
    let store = Arc::new(SqliteStore::open(&db_path).context("Failed to open task store")?);
    let broker = Arc::new(MemoryBroker::new());

    let (change_tx, mut change_rx) = mpsc::unbounded_channel();

    let registry = TaskRegistry::new(config.registry.clone(), broker, store, change_tx)
        .await
        .context("Failed to start task registry")?;
    let handle = registry.handle();
    let registry_task = tokio::spawn(registry.run());

    // Surface change tokens in the log; observers would invalidate caches
    tokio::spawn(async move {
        while let Some(token) = change_rx.recv().await {
            info!(%token, "data domain changed");
        }
    });

    println!("taskmirror running (store: {})", db_path.display());
    tokio::signal::ctrl_c().await.context("Failed to wait for Ctrl-C")?;

    info!("Ctrl-C received, shutting down");
    handle.shutdown().await.context("Failed to request shutdown")?;
    registry_task.await.context("Registry task panicked")?;

    Ok(())
}

/// List tasks straight from the store
fn cmd_list(config: &Config, format: OutputFormat) -> Result<()> {
    let db_path = config.storage.database_path();
    let store = SqliteStore::open(&db_path).context("Failed to open task store")?;
    let records = store.list_tasks().context("Failed to list tasks")?;

    match format {
        OutputFormat::Json => {
            let views: Vec<_> = records.iter().map(|r| r.view()).collect();
            println!("{}", serde_json::to_string_pretty(&views)?);
        }
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No tasks recorded.");
                return Ok(());
            }
            for record in records {
                let status = record
                    .status
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  {:12}  {:10}  {}",
                    record.task_id, record.task_type, status, record.date_added
                );
            }
        }
    }

    Ok(())
}
