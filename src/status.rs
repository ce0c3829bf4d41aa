//! # System Status Module
//!
//! The ephemeral, never-persisted view of the pipeline that the display and
//! reporting collaborators consume.
//!
//! Single-writer / multi-reader: the ingestion loop rebuilds and publishes a
//! fresh [`SystemStatus`] every cycle; readers always receive an owned copy,
//! never a live reference, so a concurrently running consumer cannot observe
//! a torn update.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use crate::alerts::AlertEvent;

/// Most-recent-first alert buffer length in the published status
pub const MAX_STATUS_ALERTS: usize = 16;

/// Snapshot of the pipeline, rebuilt every ingestion cycle
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    /// Serial link healthy (fresh frames arriving)
    pub connected: bool,

    /// Seconds since epoch of the most recent successful ingestion
    pub last_update: f64,

    /// Recent alerts, most recent first, bounded at [`MAX_STATUS_ALERTS`]
    pub alerts: VecDeque<AlertEvent>,

    /// Whether a mission is currently open
    pub mission_active: bool,

    /// Mirrored from the active mission (zero while idle)
    pub deterrent_activations: u32,

    /// Mirrored from the active mission (zero while idle)
    pub total_birds_deterred: u32,

    /// False once a write exhausts its retry budget, until writes recover
    pub storage_ok: bool,
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self {
            connected: false,
            last_update: 0.0,
            alerts: VecDeque::new(),
            mission_active: false,
            deterrent_activations: 0,
            total_birds_deterred: 0,
            storage_ok: true,
        }
    }
}

impl SystemStatus {
    /// Push an alert onto the front of the buffer, dropping the oldest
    /// entry beyond [`MAX_STATUS_ALERTS`]
    pub fn push_alert(&mut self, event: AlertEvent) {
        self.alerts.push_front(event);
        self.alerts.truncate(MAX_STATUS_ALERTS);
    }
}

/// Shared handle to the published status
///
/// Clone freely; the ingestion loop holds one clone as the single writer,
/// every consumer holds another and only ever reads.
#[derive(Clone, Default)]
pub struct StatusHandle {
    inner: Arc<RwLock<SystemStatus>>,
}

impl StatusHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published status (ingestion loop only)
    pub fn publish(&self, status: SystemStatus) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = status;
    }

    /// Owned copy of the current status
    ///
    /// Never blocks beyond the bounded copy under the read lock.
    pub fn snapshot(&self) -> SystemStatus {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Current status rendered as JSON, for display/reporting transports
    pub fn snapshot_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or(serde_json::Value::Null)
    }
}

impl std::fmt::Debug for StatusHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusHandle").finish_non_exhaustive()
    }
}
