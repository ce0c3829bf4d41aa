//! # Talon GCS
//!
//! Ground station for a bird-deterrent drone.
//!
//! This binary wires the telemetry pipeline together: the serial downlink
//! feeds the ingestion loop, which decodes frames, raises threshold alerts,
//! persists everything to SQLite, and publishes a status snapshot for the
//! display; a backup scheduler snapshots the database on its own timer.

use anyhow::Result;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use talon_gcs::backup::BackupScheduler;
use talon_gcs::config::Config;
use talon_gcs::ingest::Ingestor;
use talon_gcs::mission::MissionTracker;
use talon_gcs::serial::DroneSerial;
use talon_gcs::status::StatusHandle;
use talon_gcs::storage::Storage;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for the ground station
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load and validate configuration (fatal on error)
///    - Set up logging to stdout and the configured log file
///    - Open or create the telemetry database (fatal on error)
///    - Open the drone serial port (a missing device is not fatal; the
///      pipeline reports `connected=false` until frames arrive)
///
/// 2. **Steady state**
///    - The ingestion loop runs one pipeline cycle per update interval
///    - The backup scheduler snapshots the database on its own interval
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C signals both tasks through a watch channel
///    - The ingestion loop finishes its current cycle's persistence step,
///      the backup scheduler skips its next fire, then both exit
///
/// # Errors
///
/// Returns error if configuration is invalid or the database cannot be
/// initialized. Everything after startup is absorbed and reported through
/// the event log and the published status.
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;

    // Log to stdout and the configured file.
    std::fs::create_dir_all(&config.log.dir)?;
    let file_appender = tracing_appender::rolling::never(&config.log.dir, &config.log.file);
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .init();

    info!("Talon GCS v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path);

    let storage = Arc::new(Storage::open(&config.storage.database_file)?);
    let status = StatusHandle::new();
    let mission = Arc::new(Mutex::new(MissionTracker::new(storage.clone())));

    let serial = DroneSerial::connect(&config.serial);
    let ingestor = Ingestor::new(
        serial,
        storage.clone(),
        config.clone(),
        status.clone(),
        mission.clone(),
    );
    let scheduler = BackupScheduler::new(storage.clone(), config.storage.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let backup_task = tokio::spawn(scheduler.run(shutdown_rx.clone()));
    let ingest_task = tokio::spawn(ingestor.run(shutdown_rx));

    info!("Pipeline running; press Ctrl+C to exit");
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");

    shutdown_tx.send(true)?;
    ingest_task.await?;
    backup_task.await?;

    info!("Shutdown complete");
    Ok(())
}
