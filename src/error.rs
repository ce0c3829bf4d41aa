//! # Error Types
//!
//! Custom error types for Talon GCS using `thiserror`.
//!
//! Only `Config` and a failed storage open are fatal at startup; every other
//! variant is absorbed by the ingestion loop and surfaced through the event
//! log or the published status.

use thiserror::Error;

/// Main error type for Talon GCS
#[derive(Debug, Error)]
pub enum GcsError {
    /// Malformed telemetry frame; the frame is discarded and the cycle continues
    #[error("frame decode error: {0}")]
    Decode(String),

    /// Serial link unavailable, closed, or timed out past its budget
    #[error("serial connection error: {0}")]
    Connection(String),

    /// Database read/write failure
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Mission lifecycle misuse (e.g. starting a mission while one is active)
    #[error("mission state error: {0}")]
    MissionState(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Talon GCS
pub type Result<T> = std::result::Result<T, GcsError>;
