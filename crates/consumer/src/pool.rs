//! Fan-out of one worker task per partition.

use crate::error::ConsumerError;
use crate::processor::BatchProcessor;
use crate::source::PartitionSource;
use crate::worker::{PartitionWorker, WorkerConfig, WorkerReport};
use adstream_metrics::ConsumerMetrics;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Spawn a [`PartitionWorker`] for every source and wait for all of them.
///
/// Workers are independent: one that panics is logged and left out of the
/// returned reports while the others keep running. Reports come back in the
/// order of `sources`.
pub async fn run_partition_workers<S, P>(
    sources: Vec<S>,
    processor: Arc<P>,
    metrics: Arc<ConsumerMetrics>,
    config: WorkerConfig,
    cancel: CancellationToken,
) -> Result<Vec<WorkerReport>, ConsumerError>
where
    S: PartitionSource + 'static,
    P: BatchProcessor + ?Sized + 'static,
{
    if sources.is_empty() {
        return Err(ConsumerError::InvalidConfig(
            "no partitions to consume".to_string(),
        ));
    }

    info!(
        "Consumer started with batch size: {} across {} partitions",
        config.batch_size,
        sources.len()
    );

    let mut handles = Vec::with_capacity(sources.len());
    for source in sources {
        let partition = source.partition();
        let worker = PartitionWorker::new(
            source,
            Arc::clone(&processor),
            Arc::clone(&metrics),
            config.clone(),
        );
        handles.push((partition, tokio::spawn(worker.run(cancel.clone()))));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for (partition, handle) in handles {
        match handle.await {
            Ok(report) => reports.push(report),
            Err(e) => error!("Partition {partition} worker task failed: {e}"),
        }
    }

    Ok(reports)
}

/// Sum of batches processed across `reports`.
pub fn total_batches(reports: &[WorkerReport]) -> u64 {
    reports.iter().map(|report| report.batches_flushed).sum()
}
