//! # Alert Module
//!
//! Alert event types and the threshold evaluator.
//!
//! This module handles:
//! - The alert/event taxonomy shared by the evaluator, storage, and status
//! - Classifying one telemetry record against the configured thresholds

pub mod evaluator;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::GcsError;

/// Discrete event categories persisted to the events table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    BatteryLow,
    TemperatureHigh,
    BirdProximity,
    SystemFailure,
    ConnectionLost,
    DecodeError,
    MissionAnomaly,
    StorageDegraded,
}

impl AlertType {
    /// Stable label used in the events table
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::BatteryLow => "battery_low",
            AlertType::TemperatureHigh => "temperature_high",
            AlertType::BirdProximity => "bird_proximity",
            AlertType::SystemFailure => "system_failure",
            AlertType::ConnectionLost => "connection_lost",
            AlertType::DecodeError => "decode_error",
            AlertType::MissionAnomaly => "mission_anomaly",
            AlertType::StorageDegraded => "storage_degraded",
        }
    }
}

impl FromStr for AlertType {
    type Err = GcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "battery_low" => Ok(AlertType::BatteryLow),
            "temperature_high" => Ok(AlertType::TemperatureHigh),
            "bird_proximity" => Ok(AlertType::BirdProximity),
            "system_failure" => Ok(AlertType::SystemFailure),
            "connection_lost" => Ok(AlertType::ConnectionLost),
            "decode_error" => Ok(AlertType::DecodeError),
            "mission_anomaly" => Ok(AlertType::MissionAnomaly),
            "storage_degraded" => Ok(AlertType::StorageDegraded),
            other => Err(GcsError::Decode(format!("unknown event type: {:?}", other))),
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Stable label used in the events table
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = GcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(GcsError::Decode(format!("unknown severity: {:?}", other))),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discrete event
///
/// Immutable; persisted once, never updated. Threshold events carry the
/// triggering record's timestamp, internal events (connection, decode,
/// storage, mission anomalies) carry the ground-station clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    /// Seconds since epoch
    pub timestamp: f64,

    /// Event category
    pub alert_type: AlertType,

    /// Human-readable description
    pub description: String,

    /// Severity classification
    pub severity: Severity,
}

impl AlertEvent {
    /// Create a new event
    pub fn new(
        timestamp: f64,
        alert_type: AlertType,
        description: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            timestamp,
            alert_type,
            description: description.into(),
            severity,
        }
    }
}
