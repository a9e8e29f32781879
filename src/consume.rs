//! `consume` role handler.

use crate::ConsumeArgs;
use adstream_consumer::{
    discover_partitions, run_partition_workers, total_batches, KafkaPartitionSource,
    KafkaSourceConfig, ThrottleProcessor, WorkerConfig, WorkerReport,
};
use adstream_metrics::{serve_metrics, ConsumerMetrics};
use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Consume every partition of the topic until the sources close or `cancel` fires.
pub async fn run_consume(
    args: ConsumeArgs,
    cancel: CancellationToken,
) -> anyhow::Result<Vec<WorkerReport>> {
    let worker_config = WorkerConfig::new(args.batch_size, args.trailing_batch.into())?;
    let source_config = KafkaSourceConfig {
        brokers: args.kafka.broker_url.clone(),
        topic: args.kafka.topic.clone(),
        group_id: args.group_id.clone(),
        stop_at_eof: args.stop_at_eof,
    };

    let partitions = discover_partitions(&source_config, args.kafka.connect_timeout)
        .await
        .with_context(|| format!("Kafka broker {} is not usable", args.kafka.broker_url))?;

    let sources = partitions
        .iter()
        .map(|&partition| KafkaPartitionSource::open(&source_config, partition))
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to open partition consumers")?;

    let metrics = Arc::new(ConsumerMetrics::new().context("Failed to create consumer metrics")?);
    let server_cancel = cancel.child_token();
    let server = serve_metrics(
        &args.metrics_addr,
        metrics.registry().clone(),
        server_cancel.clone(),
    )
    .await
    .context("Failed to start metrics endpoint")?;

    info!(
        "Processing batches of {} with {:?} delay ({:?} trailing batch policy)",
        args.batch_size, args.batch_delay, args.trailing_batch
    );

    let processor = Arc::new(ThrottleProcessor::new(args.batch_delay));
    let result = run_partition_workers(
        sources,
        processor,
        Arc::clone(&metrics),
        worker_config,
        cancel,
    )
    .await;

    server_cancel.cancel();
    server.join().await;

    let reports = result.context("Consumer failed")?;
    for report in &reports {
        info!(
            "Partition {}: {} records, {} batches, {} malformed, {} dropped ({:?})",
            report.partition,
            report.records_consumed,
            report.batches_flushed,
            report.malformed_records,
            report.trailing_dropped,
            report.exit
        );
    }
    info!(
        "Consumer finished: {} batches across {} partitions",
        total_batches(&reports),
        reports.len()
    );

    Ok(reports)
}
