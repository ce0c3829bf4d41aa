//! # Mission Module
//!
//! Lifecycle of the single active mission: start/stop transitions, running
//! counters, and the success rate computed at close time.
//!
//! At most one mission is active (end_time unset) at any instant. Starting
//! while one is active auto-closes the prior mission first and reports the
//! anomaly; it never faults.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::alerts::{AlertEvent, AlertType, Severity};
use crate::error::Result;
use crate::storage::Storage;

/// Final counters written to a mission row on close
#[derive(Debug, Clone, PartialEq)]
pub struct MissionSummary {
    pub end_time: f64,
    pub total_birds_detected: u32,
    pub deterrent_activations: u32,
    pub success_rate: f64,
    pub notes: String,
}

/// In-memory image of the open mission
///
/// Counters are authoritative here while the mission runs; the open database
/// row exists only so a crash leaves a visible stub.
#[derive(Debug, Clone)]
struct ActiveMission {
    id: i64,
    mission_type: String,
    total_birds_detected: u32,
    deterrent_activations: u32,
}

/// Owns the active-mission aggregate
pub struct MissionTracker {
    storage: Arc<Storage>,
    active: Option<ActiveMission>,
}

impl MissionTracker {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            active: None,
        }
    }

    /// Whether a mission is currently open
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Running counters of the active mission: (detections, activations)
    ///
    /// Zero/zero while idle.
    pub fn counters(&self) -> (u32, u32) {
        self.active
            .as_ref()
            .map(|m| (m.total_birds_detected, m.deterrent_activations))
            .unwrap_or((0, 0))
    }

    /// Open a new mission at `now` (seconds since epoch)
    ///
    /// If a mission is already active it is closed first with an anomaly
    /// note, and a `mission_anomaly` event is recorded.
    pub fn start(&mut self, mission_type: &str, now: f64) -> Result<()> {
        if self.active.is_some() {
            warn!("Mission start requested while one is active; closing the active mission first");
            let anomaly = AlertEvent::new(
                now,
                AlertType::MissionAnomaly,
                format!("Mission {:?} started while another was active", mission_type),
                Severity::Warning,
            );
            if let Err(e) = self.storage.insert_event(&anomaly) {
                warn!("Failed to record mission anomaly event: {}", e);
            }
            self.close_active(now, "auto-closed by a new mission start")?;
        }

        let id = self.storage.open_mission(now, mission_type)?;
        info!("Mission {:?} started (id {})", mission_type, id);
        self.active = Some(ActiveMission {
            id,
            mission_type: mission_type.to_string(),
            total_birds_detected: 0,
            deterrent_activations: 0,
        });
        Ok(())
    }

    /// Close the active mission at `now`, persisting its summary
    ///
    /// Stopping while idle is a reported no-op, never a fault.
    pub fn stop(&mut self, notes: &str, now: f64) -> Result<()> {
        if self.active.is_none() {
            warn!("Mission stop requested while idle; ignoring");
            return Ok(());
        }
        self.close_active(now, notes)
    }

    /// Count one bird detection against the active mission
    ///
    /// No-op while idle: detections outside a mission are still persisted as
    /// telemetry, they just do not count toward any summary.
    pub fn record_detection(&mut self) {
        match self.active.as_mut() {
            Some(mission) => mission.total_birds_detected += 1,
            None => debug!("Bird detection outside an active mission; not counted"),
        }
    }

    /// Count one deterrent activation against the active mission
    pub fn record_deterrent_activation(&mut self) {
        match self.active.as_mut() {
            Some(mission) => mission.deterrent_activations += 1,
            None => debug!("Deterrent activation outside an active mission; not counted"),
        }
    }

    fn close_active(&mut self, now: f64, notes: &str) -> Result<()> {
        if let Some(mission) = self.active.take() {
            let summary = MissionSummary {
                end_time: now,
                total_birds_detected: mission.total_birds_detected,
                deterrent_activations: mission.deterrent_activations,
                success_rate: success_rate(
                    mission.deterrent_activations,
                    mission.total_birds_detected,
                ),
                notes: notes.to_string(),
            };
            self.storage.close_mission(mission.id, &summary)?;
            info!(
                "Mission {:?} closed (id {}): {} detections, {} activations, success rate {:.2}",
                mission.mission_type,
                mission.id,
                summary.total_birds_detected,
                summary.deterrent_activations,
                summary.success_rate
            );
        }
        Ok(())
    }
}

/// Activations over detections, clamped to [0, 1]; zero with no detections
pub fn success_rate(activations: u32, detections: u32) -> f64 {
    if detections == 0 {
        return 0.0;
    }
    (f64::from(activations) / f64::from(detections)).clamp(0.0, 1.0)
}
