//! # Telemetry Wire Protocol Constants and Types
//!
//! Core definitions for the drone's line-oriented telemetry format.
//!
//! One record per line, comma-separated:
//! `timestamp,state,battery_voltage,temperature,bird_count,closest_bird_distance,weather_status,system_health[,latitude,longitude,altitude,heading]`

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::GcsError;

/// Field delimiter within one frame
pub const FRAME_DELIMITER: char = ',';

/// Required field count (position block absent)
pub const FRAME_BASE_FIELDS: usize = 8;

/// Field count with the optional position block
pub const FRAME_FULL_FIELDS: usize = 12;

/// Reported distance at or above this means "no bird detected".
///
/// The drone reports 999.0 m while idle; anything below it is a real
/// detection eligible for proximity alerting.
pub const NO_BIRD_DISTANCE_M: f64 = 999.0;

/// Operational state reported by the drone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DroneState {
    Idle,
    Patrolling,
    Deterring,
    Returning,
    Fault,
}

impl DroneState {
    /// Wire label for this state
    pub fn as_str(&self) -> &'static str {
        match self {
            DroneState::Idle => "idle",
            DroneState::Patrolling => "patrolling",
            DroneState::Deterring => "deterring",
            DroneState::Returning => "returning",
            DroneState::Fault => "fault",
        }
    }
}

impl FromStr for DroneState {
    type Err = GcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(DroneState::Idle),
            "patrolling" => Ok(DroneState::Patrolling),
            "deterring" => Ok(DroneState::Deterring),
            "returning" => Ok(DroneState::Returning),
            "fault" => Ok(DroneState::Fault),
            other => Err(GcsError::Decode(format!("unknown drone state: {:?}", other))),
        }
    }
}

impl fmt::Display for DroneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weather condition reported by the drone's protection subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherStatus {
    Clear,
    LightRain,
    HeavyRain,
    Snow,
    HighWind,
    Storm,
    Extreme,
}

impl WeatherStatus {
    /// Wire label for this condition
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherStatus::Clear => "clear",
            WeatherStatus::LightRain => "light_rain",
            WeatherStatus::HeavyRain => "heavy_rain",
            WeatherStatus::Snow => "snow",
            WeatherStatus::HighWind => "high_wind",
            WeatherStatus::Storm => "storm",
            WeatherStatus::Extreme => "extreme",
        }
    }
}

impl FromStr for WeatherStatus {
    type Err = GcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clear" => Ok(WeatherStatus::Clear),
            "light_rain" => Ok(WeatherStatus::LightRain),
            "heavy_rain" => Ok(WeatherStatus::HeavyRain),
            "snow" => Ok(WeatherStatus::Snow),
            "high_wind" => Ok(WeatherStatus::HighWind),
            "storm" => Ok(WeatherStatus::Storm),
            "extreme" => Ok(WeatherStatus::Extreme),
            other => Err(GcsError::Decode(format!("unknown weather status: {:?}", other))),
        }
    }
}

impl fmt::Display for WeatherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate health label reported by the drone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemHealth {
    Ok,
    Degraded,
    Fault,
}

impl SystemHealth {
    /// Wire label for this health state
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemHealth::Ok => "ok",
            SystemHealth::Degraded => "degraded",
            SystemHealth::Fault => "fault",
        }
    }

    /// True when the drone reports a hard failure
    pub fn is_fault(&self) -> bool {
        matches!(self, SystemHealth::Fault)
    }
}

impl FromStr for SystemHealth {
    type Err = GcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(SystemHealth::Ok),
            "degraded" => Ok(SystemHealth::Degraded),
            "fault" => Ok(SystemHealth::Fault),
            other => Err(GcsError::Decode(format!("unknown system health: {:?}", other))),
        }
    }
}

impl fmt::Display for SystemHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GPS fix reported by the drone
///
/// Absent entirely when the drone has no fix, rather than all-zero
/// coordinates, so a genuine 0°/0° position is never conflated with
/// "GPS unavailable".
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,

    /// Altitude in meters
    pub altitude: f64,

    /// Heading in degrees
    pub heading: f64,
}

/// One validated telemetry sample from the drone
///
/// Immutable once constructed; handed to storage and the mission tracker
/// by value at the end of the ingestion cycle that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    /// Seconds since epoch, as stamped by the drone
    pub timestamp: f64,

    /// Operational state
    pub state: DroneState,

    /// Battery voltage in volts
    pub battery_voltage: f64,

    /// Temperature in °C
    pub temperature: f64,

    /// Birds currently tracked
    pub bird_count: u32,

    /// Distance to the closest tracked bird in meters
    ///
    /// Carries [`NO_BIRD_DISTANCE_M`] (or above) when nothing is tracked.
    pub closest_bird_distance: f64,

    /// Weather condition label
    pub weather_status: WeatherStatus,

    /// Aggregate health label
    pub system_health: SystemHealth,

    /// GPS fix, absent when unavailable
    pub position: Option<Position>,
}

impl TelemetryRecord {
    /// True when `closest_bird_distance` is a real detection rather than
    /// the no-detection sentinel
    pub fn has_bird_detection(&self) -> bool {
        self.closest_bird_distance < NO_BIRD_DISTANCE_M
    }
}
