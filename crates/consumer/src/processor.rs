//! Batch processing capability.

use crate::error::ProcessError;
use adstream_record::ConsumedRecord;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Work performed on every completed batch.
///
/// A worker awaits `process` before it receives anything else from its
/// partition, so at most one batch per partition is in flight.
/// Implementations should return [`ProcessError::Cancelled`] promptly once
/// `cancel` fires.
#[async_trait]
pub trait BatchProcessor: Send + Sync {
    async fn process(
        &self,
        partition: i32,
        batch: &[ConsumedRecord],
        cancel: &CancellationToken,
    ) -> Result<(), ProcessError>;
}

/// Closures receive an owned copy of the batch and are not cancellable.
#[async_trait]
impl<F, Fut> BatchProcessor for F
where
    F: Fn(i32, Vec<ConsumedRecord>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ProcessError>> + Send,
{
    async fn process(
        &self,
        partition: i32,
        batch: &[ConsumedRecord],
        _cancel: &CancellationToken,
    ) -> Result<(), ProcessError> {
        self(partition, batch.to_vec()).await
    }
}

/// Stand-in for downstream work: holds the worker for a fixed delay.
#[derive(Debug, Clone)]
pub struct ThrottleProcessor {
    delay: Duration,
}

impl ThrottleProcessor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl BatchProcessor for ThrottleProcessor {
    async fn process(
        &self,
        _partition: i32,
        _batch: &[ConsumedRecord],
        cancel: &CancellationToken,
    ) -> Result<(), ProcessError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(ProcessError::Cancelled),
            _ = tokio::time::sleep(self.delay) => Ok(()),
        }
    }
}
