//! # Telemetry Frame Module
//!
//! Implementation of the drone's line-oriented telemetry wire format.
//!
//! This module handles:
//! - Field layout, label sets, and the no-detection distance sentinel
//! - Decoding one raw serial line into a validated [`protocol::TelemetryRecord`]
//! - Re-encoding a record in wire field order

pub mod protocol;
pub mod encoder;
pub mod decoder;
