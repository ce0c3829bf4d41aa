//! Trait abstraction for the telemetry frame source to enable testing

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// One-frame-at-a-time source of raw telemetry lines
///
/// `Ok(None)` means the bounded read window elapsed with no complete frame;
/// that is not an error, the cycle simply yields no record.
#[async_trait]
pub trait FrameSource: Send {
    /// Read the next complete frame, waiting at most `timeout`
    async fn next_frame(&mut self, timeout: Duration) -> Result<Option<String>>;
}
