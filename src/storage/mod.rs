//! # Storage Module
//!
//! Durable persistence for telemetry samples, discrete events, and mission
//! summaries, backed by SQLite.
//!
//! This module handles:
//! - Idempotent schema creation (create-if-absent, never destructive)
//! - Append-only telemetry and event inserts
//! - Insert-then-update mission rows (open on start, closed on stop)
//! - Windowed telemetry queries for external reporting
//! - Consistent point-in-time snapshots via the SQLite online backup API
//!
//! The single-active-mission invariant is NOT enforced here; that is the
//! mission tracker's responsibility. Storage persists whatever it is given.

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

use crate::alerts::{AlertEvent, AlertType, Severity};
use crate::error::Result;
use crate::frame::protocol::{DroneState, Position, SystemHealth, TelemetryRecord, WeatherStatus};
use crate::mission::MissionSummary;

/// Durable store shared by the ingestion loop and the backup scheduler.
///
/// All access is serialized through one connection guarded by a mutex, so a
/// backup snapshot can never observe a half-applied write.
pub struct Storage {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Storage {
    /// Open (or create) the backing store at `path`
    ///
    /// Initialization is idempotent: opening an existing database with the
    /// expected schema never drops rows.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or schema creation fails.
    /// This is the one storage failure that is fatal, since it happens at
    /// startup before the pipeline runs.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;

        // WAL keeps the reporting readers off the writer's back.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS telemetry (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp REAL NOT NULL,
                state TEXT NOT NULL,
                battery_voltage REAL NOT NULL,
                temperature REAL NOT NULL,
                bird_count INTEGER NOT NULL,
                closest_bird_distance REAL NOT NULL,
                weather_status TEXT NOT NULL,
                system_health TEXT NOT NULL,
                latitude REAL,
                longitude REAL,
                altitude REAL,
                heading REAL
            );
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp REAL NOT NULL,
                event_type TEXT NOT NULL,
                description TEXT NOT NULL,
                severity TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS missions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                start_time REAL NOT NULL,
                end_time REAL,
                mission_type TEXT NOT NULL,
                total_birds_detected INTEGER NOT NULL DEFAULT 0,
                deterrent_activations INTEGER NOT NULL DEFAULT 0,
                success_rate REAL NOT NULL DEFAULT 0.0,
                notes TEXT NOT NULL DEFAULT ''
            );",
        )?;

        info!("Storage ready at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Path of the backing database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock means a writer panicked mid-call; the connection
        // itself is still transactionally consistent.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append one telemetry row
    ///
    /// # Errors
    ///
    /// Surfaces the write failure to the caller; the ingestion loop keeps
    /// the record in its retry queue rather than dropping it.
    pub fn insert_telemetry(&self, record: &TelemetryRecord) -> Result<()> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO telemetry (
                timestamp, state, battery_voltage, temperature,
                bird_count, closest_bird_distance, weather_status,
                system_health, latitude, longitude, altitude, heading
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )?;
        stmt.execute(params![
            record.timestamp,
            record.state.as_str(),
            record.battery_voltage,
            record.temperature,
            record.bird_count,
            record.closest_bird_distance,
            record.weather_status.as_str(),
            record.system_health.as_str(),
            record.position.map(|p| p.latitude),
            record.position.map(|p| p.longitude),
            record.position.map(|p| p.altitude),
            record.position.map(|p| p.heading),
        ])?;
        Ok(())
    }

    /// Append one event row
    ///
    /// Same durability contract as [`Storage::insert_telemetry`].
    pub fn insert_event(&self, event: &AlertEvent) -> Result<()> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO events (timestamp, event_type, description, severity)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        stmt.execute(params![
            event.timestamp,
            event.alert_type.as_str(),
            event.description,
            event.severity.as_str(),
        ])?;
        Ok(())
    }

    /// Insert an open mission row (end_time unset) and return its id
    pub fn open_mission(&self, start_time: f64, mission_type: &str) -> Result<i64> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO missions (start_time, mission_type) VALUES (?1, ?2)",
        )?;
        stmt.execute(params![start_time, mission_type])?;
        Ok(conn.last_insert_rowid())
    }

    /// Finalize a previously opened mission row
    pub fn close_mission(&self, mission_id: i64, summary: &MissionSummary) -> Result<()> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "UPDATE missions SET
                end_time = ?2,
                total_birds_detected = ?3,
                deterrent_activations = ?4,
                success_rate = ?5,
                notes = ?6
             WHERE id = ?1",
        )?;
        stmt.execute(params![
            mission_id,
            summary.end_time,
            summary.total_birds_detected,
            summary.deterrent_activations,
            summary.success_rate,
            summary.notes,
        ])?;
        Ok(())
    }

    /// Telemetry rows from the trailing window, oldest first
    ///
    /// Reporting-only: the core pipeline never reads this.
    pub fn telemetry_since(&self, window: Duration) -> Result<Vec<TelemetryRecord>> {
        let cutoff = chrono::Utc::now().timestamp_millis() as f64 / 1000.0 - window.as_secs_f64();
        self.telemetry_after(cutoff)
    }

    /// Telemetry rows with `timestamp >= cutoff`, oldest first
    pub fn telemetry_after(&self, cutoff: f64) -> Result<Vec<TelemetryRecord>> {
        let raw: Vec<RawTelemetryRow> = {
            let conn = self.conn();
            let mut stmt = conn.prepare_cached(
                "SELECT timestamp, state, battery_voltage, temperature,
                        bird_count, closest_bird_distance, weather_status,
                        system_health, latitude, longitude, altitude, heading
                 FROM telemetry
                 WHERE timestamp >= ?1
                 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![cutoff], |row| {
                Ok(RawTelemetryRow {
                    timestamp: row.get(0)?,
                    state: row.get(1)?,
                    battery_voltage: row.get(2)?,
                    temperature: row.get(3)?,
                    bird_count: row.get(4)?,
                    closest_bird_distance: row.get(5)?,
                    weather_status: row.get(6)?,
                    system_health: row.get(7)?,
                    latitude: row.get(8)?,
                    longitude: row.get(9)?,
                    altitude: row.get(10)?,
                    heading: row.get(11)?,
                })
            })?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        raw.into_iter().map(RawTelemetryRow::into_record).collect()
    }

    /// Most recent events, newest first
    ///
    /// Feeds external reporting surfaces; the in-memory status buffer is the
    /// authoritative "recent alerts" view for the display.
    pub fn recent_events(&self, limit: usize) -> Result<Vec<AlertEvent>> {
        let raw: Vec<(f64, String, String, String)> = {
            let conn = self.conn();
            let mut stmt = conn.prepare_cached(
                "SELECT timestamp, event_type, description, severity
                 FROM events
                 ORDER BY id DESC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        raw.into_iter()
            .map(|(timestamp, event_type, description, severity)| {
                Ok(AlertEvent {
                    timestamp,
                    alert_type: event_type.parse::<AlertType>()?,
                    description,
                    severity: severity.parse::<Severity>()?,
                })
            })
            .collect()
    }

    /// Write a consistent point-in-time copy of the database to `dest`
    ///
    /// Runs under the same connection lock as the writers, so the snapshot
    /// is always of a storage-consistent point.
    pub fn backup_to(&self, dest: &Path) -> Result<()> {
        let conn = self.conn();
        let mut dst = Connection::open(dest)?;
        let backup = rusqlite::backup::Backup::new(&conn, &mut dst)?;
        backup.run_to_completion(64, Duration::from_millis(10), None)?;
        debug!("Database snapshot written to {}", dest.display());
        Ok(())
    }
}

#[cfg(test)]
impl Storage {
    /// Flip the connection read-only so tests can exercise write-failure
    /// paths without touching the filesystem.
    pub fn simulate_write_failures(&self, enabled: bool) {
        let pragma = if enabled {
            "PRAGMA query_only=1;"
        } else {
            "PRAGMA query_only=0;"
        };
        let _ = self.conn().execute_batch(pragma);
    }
}

/// Row image read back from the telemetry table, before label parsing
struct RawTelemetryRow {
    timestamp: f64,
    state: String,
    battery_voltage: f64,
    temperature: f64,
    bird_count: u32,
    closest_bird_distance: f64,
    weather_status: String,
    system_health: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    altitude: Option<f64>,
    heading: Option<f64>,
}

impl RawTelemetryRow {
    fn into_record(self) -> Result<TelemetryRecord> {
        let position = match (self.latitude, self.longitude, self.altitude, self.heading) {
            (Some(latitude), Some(longitude), Some(altitude), Some(heading)) => Some(Position {
                latitude,
                longitude,
                altitude,
                heading,
            }),
            _ => None,
        };

        Ok(TelemetryRecord {
            timestamp: self.timestamp,
            state: self.state.parse::<DroneState>()?,
            battery_voltage: self.battery_voltage,
            temperature: self.temperature,
            bird_count: self.bird_count,
            closest_bird_distance: self.closest_bird_distance,
            weather_status: self.weather_status.parse::<WeatherStatus>()?,
            system_health: self.system_health.parse::<SystemHealth>()?,
            position,
        })
    }
}
