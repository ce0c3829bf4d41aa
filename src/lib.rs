//! # Talon GCS Library
//!
//! Ground station core for a bird-deterrent drone.
//!
//! This library provides the telemetry pipeline: frames arrive over the
//! serial downlink, are decoded and classified against configurable alert
//! thresholds, persisted to SQLite alongside any raised events, and rolled
//! up into mission summaries, while a read-only status snapshot is published
//! for display and reporting collaborators.

pub mod config;
pub mod error;
pub mod frame;
pub mod alerts;
pub mod storage;
pub mod mission;
pub mod status;
pub mod serial;
pub mod ingest;
pub mod backup;
