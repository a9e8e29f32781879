//! The paced production loop.

use crate::error::ProducerError;
use crate::pacer::Pacer;
use crate::publisher::Publisher;
use adstream_metrics::ProducerMetrics;
use adstream_record::RecordGenerator;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Parameters of one production run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Number of records to emit; ids run from 0 to `total_count - 1`.
    pub total_count: u64,
    /// Maximum steady-state emission rate.
    pub rate_per_second: f64,
    /// Abort once this many submissions in a row have failed (0 disables).
    pub max_consecutive_failures: u64,
    /// Log a progress line every this many records (0 disables).
    pub progress_interval: u64,
    /// Time allowed for in-flight records to drain at the end of the run.
    pub flush_timeout: Duration,
    /// Seed for the record generator's random fields.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            total_count: 10_000_000,
            rate_per_second: 130.0,
            max_consecutive_failures: 1000,
            progress_interval: 10_000,
            flush_timeout: Duration::from_secs(30),
            seed: None,
        }
    }
}

/// Outcome of a production run.
#[derive(Debug, Clone, Default)]
pub struct ProduceSummary {
    /// Records accepted by the publisher.
    pub submitted: u64,
    /// Records the publisher refused or failed to encode.
    pub failed: u64,
    /// Wall-clock time from the first tick to the end of the loop.
    pub elapsed: Duration,
    /// The run stopped early because the cancellation token fired.
    pub cancelled: bool,
}

impl ProduceSummary {
    pub fn attempted(&self) -> u64 {
        self.submitted + self.failed
    }

    pub fn messages_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.submitted as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Emit `config.total_count` records through `publisher`, paced at
/// `config.rate_per_second`.
///
/// Each accepted record increments `producer_messages_total`; each failed one
/// increments `producer_send_failures_total` and is reflected in the summary.
/// The loop stops early, with `cancelled` set, when `cancel` fires while it is
/// waiting for the next tick.
pub async fn run_producer<P>(
    publisher: &P,
    config: &RunConfig,
    metrics: &ProducerMetrics,
    cancel: &CancellationToken,
) -> Result<ProduceSummary, ProducerError>
where
    P: Publisher + ?Sized,
{
    let mut pacer = Pacer::new(config.rate_per_second)?;
    let mut generator = RecordGenerator::new(config.seed);
    let mut summary = ProduceSummary::default();
    let mut consecutive_failures = 0u64;
    let start = Instant::now();

    info!(
        "Producer started with limit: {} msg/sec, {} records",
        config.rate_per_second, config.total_count
    );

    for record_id in 0..config.total_count {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Producer cancelled after {} records", summary.attempted());
                summary.cancelled = true;
                break;
            }
            _ = pacer.tick() => {}
        }

        let record = generator.generate(record_id);
        let outcome = match record.encode() {
            Ok(payload) => publisher
                .publish(&record.key(), &payload)
                .await
                .map_err(ProducerError::from),
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(()) => {
                metrics.messages_produced.inc();
                summary.submitted += 1;
                consecutive_failures = 0;
                debug!("Published: {record_id}");
            }
            Err(e) => {
                metrics.send_failures.inc();
                summary.failed += 1;
                consecutive_failures += 1;
                warn!("Failed to publish record {record_id}: {e}");

                if config.max_consecutive_failures > 0
                    && consecutive_failures >= config.max_consecutive_failures
                {
                    return Err(ProducerError::TooManyFailures {
                        count: consecutive_failures,
                        last: e.to_string(),
                    });
                }
            }
        }

        if config.progress_interval > 0 && (record_id + 1) % config.progress_interval == 0 {
            info!(
                "Progress: {} / {} records ({} failed)",
                record_id + 1,
                config.total_count,
                summary.failed
            );
        }
    }

    summary.elapsed = start.elapsed();

    if let Err(e) = publisher.flush(config.flush_timeout).await {
        warn!("Producer flush did not complete: {e}");
    }

    info!(
        "Published {} records ({} failed) in {:?} ({:.2} msg/sec)",
        summary.submitted,
        summary.failed,
        summary.elapsed,
        summary.messages_per_second()
    );

    Ok(summary)
}
