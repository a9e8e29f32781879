//! The per-partition batching state machine.
//!
//! ```text
//!            recv                         len == batch_size
//!   ┌──────────────────┐            ┌──────────────────────────┐
//!   ▼                  │            │                          ▼
//! ACCUMULATING ────────┘            │                      FLUSHING
//!   │   ▲                           │                          │
//!   │   └───────────────────────────┴──── processed, reset ◄───┘
//!   │
//!   └── source closed / cancelled ──► CLOSED
//! ```

use crate::error::{ConsumerError, ProcessError};
use crate::processor::BatchProcessor;
use crate::source::{PartitionSource, RawMessage};
use adstream_metrics::ConsumerMetrics;
use adstream_record::{ConsumedRecord, RecordError};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What happens to a partial batch when the source closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingBatch {
    /// Process the partial batch like a full one.
    #[default]
    Flush,
    /// Discard the partial batch.
    Drop,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Batch capacity; a batch is processed as soon as it holds this many records.
    pub batch_size: usize,
    pub trailing_batch: TrailingBatch,
}

impl WorkerConfig {
    pub fn new(batch_size: usize, trailing_batch: TrailingBatch) -> Result<Self, ConsumerError> {
        if batch_size == 0 {
            return Err(ConsumerError::InvalidConfig(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            batch_size,
            trailing_batch,
        })
    }
}

/// Why a worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    SourceClosed,
    Cancelled,
}

/// Per-partition accounting returned when a worker stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub partition: i32,
    /// Records decoded and placed into a batch.
    pub records_consumed: u64,
    pub malformed_records: u64,
    pub receive_errors: u64,
    /// Batches processed successfully, trailing flush included.
    pub batches_flushed: u64,
    pub batch_failures: u64,
    /// Records left in the buffer and never processed.
    pub trailing_dropped: u64,
    pub exit: WorkerExit,
}

impl WorkerReport {
    fn new(partition: i32) -> Self {
        Self {
            partition,
            records_consumed: 0,
            malformed_records: 0,
            receive_errors: 0,
            batches_flushed: 0,
            batch_failures: 0,
            trailing_dropped: 0,
            exit: WorkerExit::SourceClosed,
        }
    }
}

enum Flush {
    Done,
    Cancelled,
}

/// Consumes one partition and processes it batch by batch.
pub struct PartitionWorker<S, P: ?Sized> {
    source: S,
    processor: Arc<P>,
    metrics: Arc<ConsumerMetrics>,
    config: WorkerConfig,
    batch: Vec<ConsumedRecord>,
    report: WorkerReport,
}

impl<S, P> PartitionWorker<S, P>
where
    S: PartitionSource,
    P: BatchProcessor + ?Sized,
{
    pub fn new(
        source: S,
        processor: Arc<P>,
        metrics: Arc<ConsumerMetrics>,
        config: WorkerConfig,
    ) -> Self {
        let partition = source.partition();
        Self {
            source,
            processor,
            metrics,
            batch: Vec::with_capacity(config.batch_size),
            config,
            report: WorkerReport::new(partition),
        }
    }

    pub fn partition(&self) -> i32 {
        self.report.partition
    }

    /// Run until the source closes or `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) -> WorkerReport {
        let partition = self.partition();
        debug!("Partition {partition} worker started");

        let mut exit = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break WorkerExit::Cancelled,
                next = self.source.recv() => next,
            };

            let message = match next {
                None => break WorkerExit::SourceClosed,
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    self.report.receive_errors += 1;
                    self.metrics.receive_errors.inc();
                    warn!("Partition {partition} receive error: {e}");
                    continue;
                }
            };

            let record = match decode(&message) {
                Ok(record) => record,
                Err(e) => {
                    self.report.malformed_records += 1;
                    self.metrics.malformed_records.inc();
                    warn!(
                        "Partition {partition} dropped malformed record at offset {}: {e}",
                        message.offset
                    );
                    continue;
                }
            };

            self.batch.push(record);
            self.report.records_consumed += 1;
            self.metrics.record_consumed(partition);

            if self.batch.len() >= self.config.batch_size {
                if let Flush::Cancelled = self.flush(&cancel).await {
                    break WorkerExit::Cancelled;
                }
            }
        };

        if exit == WorkerExit::SourceClosed
            && !self.batch.is_empty()
            && self.config.trailing_batch == TrailingBatch::Flush
        {
            debug!(
                "Partition {partition} flushing trailing batch of {}",
                self.batch.len()
            );
            if let Flush::Cancelled = self.flush(&cancel).await {
                exit = WorkerExit::Cancelled;
            }
        }

        if !self.batch.is_empty() {
            info!(
                "Partition {partition} dropped {} unprocessed records",
                self.batch.len()
            );
            self.report.trailing_dropped = self.batch.len() as u64;
            self.batch.clear();
        }

        self.report.exit = exit;
        info!(
            "Partition {partition} worker stopped ({exit:?}): {} records, {} batches",
            self.report.records_consumed, self.report.batches_flushed
        );
        self.report
    }

    async fn flush(&mut self, cancel: &CancellationToken) -> Flush {
        let partition = self.partition();
        let size = self.batch.len();
        let started = Instant::now();

        match self.processor.process(partition, &self.batch, cancel).await {
            Ok(()) => {
                self.metrics.record_flush(started.elapsed());
                self.report.batches_flushed += 1;
                info!("Partition {partition} processed batch of {size}");
            }
            Err(ProcessError::Cancelled) => return Flush::Cancelled,
            Err(e) => {
                self.metrics.batch_failures.inc();
                self.report.batch_failures += 1;
                error!("Partition {partition} failed to process batch of {size}: {e}");
            }
        }

        self.batch.clear();
        Flush::Done
    }
}

fn decode(message: &RawMessage) -> Result<ConsumedRecord, RecordError> {
    ConsumedRecord::decode(message.payload.as_deref().unwrap_or_default())
}
