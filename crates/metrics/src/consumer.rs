//! Consumer-side metrics.

use crate::error::MetricsError;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::time::Duration;

/// Lower bound of the first batch duration bucket, in seconds.
const DURATION_BUCKET_START: f64 = 0.005;
/// Number of exponential duration buckets; the last finite one is ~164s.
const DURATION_BUCKET_COUNT: usize = 16;

/// Counters and histograms shared by every partition worker.
#[derive(Clone)]
pub struct ConsumerMetrics {
    registry: Registry,
    /// Batches handed to the batch processor and completed.
    pub batches_processed: IntCounter,
    /// Wall-clock duration of each completed flush, throttle included.
    pub batch_duration: Histogram,
    /// Records placed into a batch, by partition.
    pub records_consumed: IntCounterVec,
    /// Payloads dropped because they did not decode.
    pub malformed_records: IntCounter,
    /// Errors returned by a partition source while receiving.
    pub receive_errors: IntCounter,
    /// Batches whose processing returned an error.
    pub batch_failures: IntCounter,
}

impl ConsumerMetrics {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let batches_processed = IntCounter::with_opts(Opts::new(
            "consumer_batches_total",
            "Number of batches processed",
        ))?;
        let batch_duration = Histogram::with_opts(
            HistogramOpts::new(
                "consumer_batch_duration_seconds",
                "Batch processing + sleep duration",
            )
            .buckets(prometheus::exponential_buckets(
                DURATION_BUCKET_START,
                2.0,
                DURATION_BUCKET_COUNT,
            )?),
        )?;
        let records_consumed = IntCounterVec::new(
            Opts::new("consumer_records_total", "Records placed into a batch"),
            &["partition"],
        )?;
        let malformed_records = IntCounter::with_opts(Opts::new(
            "consumer_malformed_records_total",
            "Payloads dropped because they could not be decoded",
        ))?;
        let receive_errors = IntCounter::with_opts(Opts::new(
            "consumer_receive_errors_total",
            "Errors returned by the log transport while receiving",
        ))?;
        let batch_failures = IntCounter::with_opts(Opts::new(
            "consumer_batch_failures_total",
            "Batches whose processing failed",
        ))?;

        registry.register(Box::new(batches_processed.clone()))?;
        registry.register(Box::new(batch_duration.clone()))?;
        registry.register(Box::new(records_consumed.clone()))?;
        registry.register(Box::new(malformed_records.clone()))?;
        registry.register(Box::new(receive_errors.clone()))?;
        registry.register(Box::new(batch_failures.clone()))?;

        Ok(Self {
            registry,
            batches_processed,
            batch_duration,
            records_consumed,
            malformed_records,
            receive_errors,
            batch_failures,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Account for one completed flush.
    pub fn record_flush(&self, elapsed: Duration) {
        self.batches_processed.inc();
        self.batch_duration.observe(elapsed.as_secs_f64());
    }

    pub fn record_consumed(&self, partition: i32) {
        self.records_consumed
            .with_label_values(&[&partition.to_string()])
            .inc();
    }
}
