//! # Serial Communication Module
//!
//! Handles the serial link to the deterrent drone.
//!
//! This module handles:
//! - Opening the configured port at 8N1 with the configured baud rate
//! - Accumulating raw bytes and splitting them into newline-delimited frames
//! - Bounded read timeouts so the ingestion loop stays responsive
//! - Dropping a dead port and reopening it with bounded backoff

pub mod source;

use bytes::{Buf, BytesMut};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::error::{GcsError, Result};
use self::source::FrameSource;

/// Read buffer chunk size; frames are short text lines
const READ_CHUNK_BYTES: usize = 256;

/// Serial frame source for the drone's telemetry downlink
///
/// Tolerates a missing or dropped device: reads fail softly, and the port is
/// reopened at most once per configured reconnect interval. The ingestion
/// loop sees the gap as timeouts and connection errors, never a blocked or
/// crashed read.
pub struct DroneSerial {
    config: SerialConfig,
    port: Option<tokio_serial::SerialStream>,
    buffer: BytesMut,
    last_reconnect_attempt: Option<Instant>,
}

impl std::fmt::Debug for DroneSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DroneSerial")
            .field("port", &self.config.port)
            .field("open", &self.port.is_some())
            .finish_non_exhaustive()
    }
}

impl DroneSerial {
    /// Create a source for the configured port, attempting an initial open
    ///
    /// An unavailable device at startup is not fatal; the source keeps
    /// retrying on the reconnect interval and the pipeline reports
    /// `connected=false` until frames arrive.
    pub fn connect(config: &SerialConfig) -> Self {
        let port = match Self::open_port(config) {
            Ok(port) => {
                info!("Opened drone serial port at {}", config.port);
                Some(port)
            }
            Err(e) => {
                warn!("Serial port not available yet: {}", e);
                None
            }
        };

        Self {
            config: config.clone(),
            port,
            buffer: BytesMut::with_capacity(READ_CHUNK_BYTES * 4),
            last_reconnect_attempt: None,
        }
    }

    /// Open the configured serial port with drone-link settings (8N1)
    fn open_port(config: &SerialConfig) -> Result<tokio_serial::SerialStream> {
        tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| GcsError::Connection(format!("failed to open {}: {}", config.port, e)))
    }

    /// At most one reopen attempt per reconnect interval
    fn try_reconnect(&mut self) -> Result<()> {
        if let Some(last) = self.last_reconnect_attempt {
            let backoff = Duration::from_millis(self.config.reconnect_interval_ms);
            if last.elapsed() < backoff {
                return Err(GcsError::Connection(format!(
                    "{} unavailable, next reconnect attempt pending",
                    self.config.port
                )));
            }
        }

        self.last_reconnect_attempt = Some(Instant::now());
        match Self::open_port(&self.config) {
            Ok(port) => {
                info!("Reopened drone serial port at {}", self.config.port);
                self.buffer.clear();
                self.port = Some(port);
                self.last_reconnect_attempt = None;
                Ok(())
            }
            Err(e) => {
                debug!("Reconnect attempt failed: {}", e);
                Err(e)
            }
        }
    }

    /// Pop one complete line out of the accumulation buffer, if present
    fn take_buffered_line(&mut self) -> Option<Result<String>> {
        let newline = self.buffer.iter().position(|&b| b == b'\n')?;
        let line = self.buffer.split_to(newline + 1);
        match std::str::from_utf8(&line[..newline]) {
            Ok(text) => Some(Ok(text.trim_end_matches('\r').to_string())),
            Err(_) => Some(Err(GcsError::Decode("frame is not valid UTF-8".to_string()))),
        }
    }
}

#[async_trait::async_trait]
impl FrameSource for DroneSerial {
    async fn next_frame(&mut self, timeout: Duration) -> Result<Option<String>> {
        if self.port.is_none() {
            self.try_reconnect()?;
        }

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(line) = self.take_buffered_line() {
                return line.map(Some);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            // Checked above; reads below may drop it again on error.
            let Some(port) = self.port.as_mut() else {
                return Ok(None);
            };

            let mut chunk = [0u8; READ_CHUNK_BYTES];
            match tokio::time::timeout(remaining, port.read(&mut chunk)).await {
                Err(_elapsed) => return Ok(None),
                Ok(Ok(0)) => {
                    self.port = None;
                    return Err(GcsError::Connection(format!(
                        "{} closed by the other end",
                        self.config.port
                    )));
                }
                Ok(Ok(n)) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    // Keep a runaway sender from growing the buffer without
                    // ever sending a newline.
                    if self.buffer.remaining() > READ_CHUNK_BYTES * 16 {
                        self.buffer.clear();
                        return Err(GcsError::Decode(
                            "frame exceeds maximum length without a newline".to_string(),
                        ));
                    }
                }
                Ok(Err(e)) => {
                    self.port = None;
                    return Err(GcsError::Connection(format!(
                        "read failed on {}: {}",
                        self.config.port, e
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(port: &str) -> SerialConfig {
        SerialConfig {
            port: port.to_string(),
            baud_rate: 115200,
            read_timeout_ms: 20,
            reconnect_interval_ms: 50,
        }
    }

    #[test]
    fn test_connect_tolerates_missing_device() {
        let serial = DroneSerial::connect(&config_for("/dev/nonexistent_drone_link"));
        assert!(serial.port.is_none());
    }

    #[tokio::test]
    async fn test_missing_device_yields_connection_error_not_panic() {
        let mut serial = DroneSerial::connect(&config_for("/dev/nonexistent_drone_link"));
        let result = serial.next_frame(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(GcsError::Connection(_))));
    }

    #[tokio::test]
    async fn test_reconnect_attempts_are_rate_limited() {
        let mut serial = DroneSerial::connect(&config_for("/dev/nonexistent_drone_link"));

        // First call performs a real (failing) open attempt.
        assert!(serial.next_frame(Duration::from_millis(5)).await.is_err());
        let first_attempt = serial.last_reconnect_attempt;
        assert!(first_attempt.is_some());

        // An immediate second call must not hit the device again.
        assert!(serial.next_frame(Duration::from_millis(5)).await.is_err());
        assert_eq!(serial.last_reconnect_attempt, first_attempt);
    }

    #[test]
    fn test_take_buffered_line_splits_frames() {
        let mut serial = DroneSerial::connect(&config_for("/dev/nonexistent_drone_link"));
        serial
            .buffer
            .extend_from_slice(b"1700000000,idle,12.6,25.0,0,999.0,clear,ok\r\npartial");

        let line = serial.take_buffered_line().unwrap().unwrap();
        assert_eq!(line, "1700000000,idle,12.6,25.0,0,999.0,clear,ok");

        // The partial tail stays buffered until its newline arrives.
        assert!(serial.take_buffered_line().is_none());
        assert_eq!(&serial.buffer[..], b"partial");
    }

    #[test]
    fn test_take_buffered_line_rejects_invalid_utf8() {
        let mut serial = DroneSerial::connect(&config_for("/dev/nonexistent_drone_link"));
        serial.buffer.extend_from_slice(&[0xFF, 0xFE, b'\n']);

        let result = serial.take_buffered_line().unwrap();
        assert!(matches!(result, Err(GcsError::Decode(_))));
        // The bad frame is consumed, not replayed forever.
        assert!(serial.buffer.is_empty());
    }
}
