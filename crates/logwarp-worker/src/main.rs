//! Logwarp worker - NATS-driven log ingestion into OpenSearch

use anyhow::{Context, Result};
use clap::Parser;
use logwarp_common::logging::{init_logging, LogConfig, LogLevel};
use logwarp_worker::{
    bus::NatsBus,
    context::WorkerContext,
    dispatcher::JobDispatcher,
    settings::{Settings, DEFAULT_SETTINGS_PATH},
    store::OpenSearchClient,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "logwarp-worker")]
#[command(author, version, about = "Parse log files and bulk-load them into OpenSearch")]
struct Cli {
    /// Settings file
    #[arg(short, long, default_value = DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("logwarp-worker")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let settings = Settings::load(&cli.settings)
        .with_context(|| format!("Failed to load settings from {}", cli.settings.display()))?;

    info!(
        opensearch = %settings.opensearch.address,
        nats = %settings.nats.address,
        log_folder = %settings.logwarp.log_folder.display(),
        bulk_size = settings.opensearch.bulk_size,
        "Starting logwarp worker"
    );

    let store = OpenSearchClient::new(&settings.opensearch)?;
    let bus = NatsBus::connect(&settings.nats.address).await?;
    let commands = bus.subscribe(&settings.nats.command_subject).await?;

    let ctx = Arc::new(WorkerContext::new(settings, Arc::new(bus), Arc::new(store)));
    let dispatcher = JobDispatcher::new(ctx);

    tokio::select! {
        _ = dispatcher.listen(commands) => {},
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("Logwarp worker stopped");
    Ok(())
}
