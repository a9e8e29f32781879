//! Seam between the production loop and the log transport.

use crate::error::PublishError;
use async_trait::async_trait;
use std::time::Duration;

/// Hands encoded records to the log transport, one at a time.
///
/// `publish` returns once the transport has accepted the record. Whether it
/// also waits for the broker acknowledgment is up to the implementation.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, key: &str, payload: &[u8]) -> Result<(), PublishError>;

    /// Wait for records accepted so far to leave the client.
    async fn flush(&self, timeout: Duration) -> Result<(), PublishError>;
}
