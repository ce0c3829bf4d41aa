//! # Backup Scheduler Module
//!
//! Timer-driven snapshots of the telemetry database.
//!
//! Runs independently of the ingestion loop; each fire asks storage for a
//! consistent point-in-time copy and writes it to a rotated location. A
//! failed backup is reported and retried at the next fire, never fatal.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::config::StorageConfig;
use crate::error::Result;
use crate::storage::Storage;

/// Rotated backup filename prefix
const BACKUP_PREFIX: &str = "telemetry-";

/// Periodic database snapshotter
pub struct BackupScheduler {
    storage: Arc<Storage>,
    config: StorageConfig,
}

impl BackupScheduler {
    pub fn new(storage: Arc<Storage>, config: StorageConfig) -> Self {
        Self { storage, config }
    }

    /// Fire every `backup_interval_s` until the shutdown signal
    ///
    /// A pending fire is skipped on shutdown; the task exits cleanly without
    /// blocking the ingestion loop's own shutdown.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = interval(Duration::from_secs(self.config.backup_interval_s));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval completes immediately; consume
        // it so the first snapshot lands one full interval after startup.
        timer.tick().await;

        info!(
            "Backup scheduler started ({}s interval, keeping {} snapshots)",
            self.config.backup_interval_s, self.config.max_backups_to_keep
        );

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    match self.backup_once() {
                        Ok(path) => info!("Database snapshot written to {}", path.display()),
                        Err(e) => warn!("Database backup failed: {}", e),
                    }
                }
                _ = shutdown.changed() => {
                    info!("Shutdown signal received; backup scheduler stopping");
                    break;
                }
            }
        }
    }

    /// Take one snapshot now and rotate old ones out
    pub fn backup_once(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.config.backup_dir)?;

        let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        let dest = PathBuf::from(&self.config.backup_dir).join(format!("{}{}.db", BACKUP_PREFIX, stamp));

        self.storage.backup_to(&dest)?;
        self.prune_old_backups()?;
        Ok(dest)
    }

    /// Keep only the newest `max_backups_to_keep` snapshots
    ///
    /// The timestamped names sort lexicographically, so name order is age
    /// order.
    fn prune_old_backups(&self) -> Result<()> {
        let mut snapshots: Vec<PathBuf> = fs::read_dir(&self.config.backup_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == "db")
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.starts_with(BACKUP_PREFIX))
            })
            .collect();

        snapshots.sort();

        while snapshots.len() > self.config.max_backups_to_keep {
            let oldest = snapshots.remove(0);
            warn!("Rotating out old snapshot {}", oldest.display());
            fs::remove_file(&oldest)?;
        }

        Ok(())
    }
}
