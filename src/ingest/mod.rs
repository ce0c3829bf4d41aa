//! # Ingestion Loop Module
//!
//! The pipeline orchestrator: one cycle per polling interval reads a frame,
//! decodes it, evaluates thresholds, persists the results, feeds the mission
//! tracker, and publishes a fresh status snapshot.
//!
//! Steps within a cycle are strictly sequential, so an alert event is never
//! persisted before its triggering telemetry record, and cycle N+1 never
//! starts before cycle N's persistence completed. The loop never terminates
//! on a recoverable error; a shutdown signal lets the current cycle finish
//! its persistence step before the loop exits.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::alerts::evaluator::evaluate;
use crate::alerts::{AlertEvent, AlertType, Severity};
use crate::config::Config;
use crate::error::GcsError;
use crate::frame::decoder::decode_line;
use crate::frame::protocol::{DroneState, TelemetryRecord};
use crate::mission::MissionTracker;
use crate::serial::source::FrameSource;
use crate::status::{StatusHandle, SystemStatus, MAX_STATUS_ALERTS};
use crate::storage::Storage;

/// Consecutive empty read windows before the link is declared down
pub const MAX_MISSED_READS: u32 = 5;

/// One row awaiting a successful write
struct PendingWrite {
    item: WriteItem,
    attempts: u32,
}

enum WriteItem {
    Telemetry(TelemetryRecord),
    Event(AlertEvent),
}

/// Drives the telemetry pipeline
///
/// Generic over the frame source so tests can script the serial link.
pub struct Ingestor<S: FrameSource> {
    source: S,
    storage: Arc<Storage>,
    config: Config,
    status: StatusHandle,
    mission: Arc<Mutex<MissionTracker>>,
    missed_reads: u32,
    connected: bool,
    last_update: f64,
    prev_state: Option<DroneState>,
    pending: VecDeque<PendingWrite>,
    status_alerts: VecDeque<AlertEvent>,
    storage_ok: bool,
}

impl<S: FrameSource> Ingestor<S> {
    pub fn new(
        source: S,
        storage: Arc<Storage>,
        config: Config,
        status: StatusHandle,
        mission: Arc<Mutex<MissionTracker>>,
    ) -> Self {
        Self {
            source,
            storage,
            config,
            status,
            mission,
            missed_reads: 0,
            connected: false,
            last_update: 0.0,
            prev_state: None,
            pending: VecDeque::new(),
            status_alerts: VecDeque::new(),
            storage_ok: true,
        }
    }

    /// Run cycles until the shutdown signal fires
    ///
    /// The serial read is the only operation that blocks within a cycle, and
    /// it does so under the configured bounded timeout, so shutdown latency
    /// is at most one cycle.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut cycle = interval(Duration::from_millis(self.config.ingest.update_interval_ms));
        cycle.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Ingestion loop started ({}ms cycle)",
            self.config.ingest.update_interval_ms
        );

        loop {
            tokio::select! {
                _ = cycle.tick() => {
                    self.run_cycle().await;
                }
                _ = shutdown.changed() => {
                    info!("Shutdown signal received; ingestion loop stopping");
                    break;
                }
            }
        }

        // Drain what the retry queue still holds before releasing the link.
        self.flush_pending();
        self.publish_status();
    }

    /// Execute one full ingestion cycle
    pub async fn run_cycle(&mut self) {
        let read_timeout = Duration::from_millis(self.config.serial.read_timeout_ms);

        let line = match self.source.next_frame(read_timeout).await {
            Ok(Some(line)) => Some(line),
            Ok(None) => {
                self.note_missed_read("read window elapsed with no frame");
                None
            }
            Err(GcsError::Decode(msg)) => {
                // Bytes arrived but never formed a usable frame.
                self.record_internal_event(AlertType::DecodeError, msg, Severity::Info);
                None
            }
            Err(e) => {
                self.note_missed_read(&e.to_string());
                None
            }
        };

        let record = line.and_then(|line| match decode_line(&line) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Discarding malformed frame {:?}: {}", line, e);
                self.record_internal_event(
                    AlertType::DecodeError,
                    format!("Discarded malformed frame: {}", e),
                    Severity::Info,
                );
                None
            }
        });

        if let Some(record) = record {
            self.missed_reads = 0;
            if !self.connected {
                info!("Drone link established");
                self.connected = true;
            }
            self.last_update = epoch_now();

            let alerts = evaluate(&record, &self.config.alerts);

            // Telemetry before its alerts, retries before both.
            self.flush_pending();
            let deterring_edge = record.state == DroneState::Deterring
                && self.prev_state != Some(DroneState::Deterring);
            self.prev_state = Some(record.state);
            self.try_write(WriteItem::Telemetry(record));
            for event in &alerts {
                self.try_write(WriteItem::Event(event.clone()));
            }

            let proximity = alerts
                .iter()
                .any(|event| event.alert_type == AlertType::BirdProximity);
            {
                let mut mission = self.mission.lock().unwrap_or_else(|e| e.into_inner());
                if proximity {
                    mission.record_detection();
                }
                if deterring_edge {
                    mission.record_deterrent_activation();
                }
            }

            for event in alerts {
                self.push_status_alert(event);
            }
        } else {
            // No record this cycle; still give queued rows their retry.
            self.flush_pending();
        }

        self.publish_status();
    }

    fn note_missed_read(&mut self, reason: &str) {
        self.missed_reads = self.missed_reads.saturating_add(1);
        debug!("No frame this cycle ({} consecutive): {}", self.missed_reads, reason);

        if self.missed_reads >= MAX_MISSED_READS && self.connected {
            self.connected = false;
            warn!(
                "No telemetry for {} consecutive cycles; marking the drone link down",
                self.missed_reads
            );
            self.record_internal_event(
                AlertType::ConnectionLost,
                format!("No telemetry for {} consecutive read windows", self.missed_reads),
                Severity::Warning,
            );
        }
    }

    /// Persist an internally generated event and surface it on the status
    /// buffer when it is user-relevant (warning or worse)
    fn record_internal_event(&mut self, alert_type: AlertType, description: String, severity: Severity) {
        let event = AlertEvent::new(epoch_now(), alert_type, description, severity);
        self.try_write(WriteItem::Event(event.clone()));
        if severity >= Severity::Warning {
            self.push_status_alert(event);
        }
    }

    fn try_write(&mut self, item: WriteItem) {
        self.attempt_write(PendingWrite { item, attempts: 0 });
    }

    /// One write attempt against the retry budget
    ///
    /// Failed rows go back on the queue until the budget is spent; spending
    /// it drops the row and degrades the published storage health instead of
    /// crashing the loop.
    fn attempt_write(&mut self, mut pending: PendingWrite) {
        let result = match &pending.item {
            WriteItem::Telemetry(record) => self.storage.insert_telemetry(record),
            WriteItem::Event(event) => self.storage.insert_event(event),
        };

        match result {
            Ok(()) => {
                if !self.storage_ok {
                    info!("Storage writes recovered");
                    self.storage_ok = true;
                }
            }
            Err(e) => {
                pending.attempts += 1;
                if pending.attempts >= self.config.storage.write_retry_budget {
                    warn!(
                        "Dropping row after {} failed write attempts: {}",
                        pending.attempts, e
                    );
                    self.storage_ok = false;
                    let degraded = AlertEvent::new(
                        epoch_now(),
                        AlertType::StorageDegraded,
                        format!("Write retry budget exhausted: {}", e),
                        Severity::Critical,
                    );
                    self.push_status_alert(degraded);
                } else {
                    debug!(
                        "Storage write failed (attempt {} of {}): {}; queued for retry",
                        pending.attempts, self.config.storage.write_retry_budget, e
                    );
                    self.pending.push_back(pending);
                }
            }
        }
    }

    fn flush_pending(&mut self) {
        let queued = std::mem::take(&mut self.pending);
        for pending in queued {
            self.attempt_write(pending);
        }
    }

    fn push_status_alert(&mut self, event: AlertEvent) {
        self.status_alerts.push_front(event);
        self.status_alerts.truncate(MAX_STATUS_ALERTS);
    }

    fn publish_status(&self) {
        let (mission_active, detections, activations) = {
            let mission = self.mission.lock().unwrap_or_else(|e| e.into_inner());
            let (detections, activations) = mission.counters();
            (mission.is_active(), detections, activations)
        };

        self.status.publish(SystemStatus {
            connected: self.connected,
            last_update: self.last_update,
            alerts: self.status_alerts.clone(),
            mission_active,
            deterrent_activations: activations,
            total_birds_deterred: detections,
            storage_ok: self.storage_ok,
        });
    }
}

fn epoch_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
