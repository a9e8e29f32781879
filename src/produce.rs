//! `produce` role handler.

use crate::ProduceArgs;
use adstream_metrics::{serve_metrics, ProducerMetrics};
use adstream_producer::{create_topic_if_not_exists, run_producer, KafkaPublisher, ProduceSummary};
use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run the producer until `total_count` records were emitted or `cancel` fires.
pub async fn run_produce(
    args: ProduceArgs,
    cancel: CancellationToken,
) -> anyhow::Result<ProduceSummary> {
    let metrics = Arc::new(ProducerMetrics::new().context("Failed to create producer metrics")?);

    if args.create_topic {
        create_topic_if_not_exists(
            &args.kafka.broker_url,
            &args.kafka.topic,
            args.partitions,
            args.kafka.connect_timeout,
        )
        .await
        .with_context(|| format!("Failed to create topic '{}'", args.kafka.topic))?;
    }

    let publisher = KafkaPublisher::new(&args.publisher_config(), Arc::clone(&metrics))
        .context("Failed to create Kafka producer")?;
    let partitions = publisher
        .probe(args.kafka.connect_timeout)
        .await
        .with_context(|| format!("Kafka broker {} is not usable", args.kafka.broker_url))?;
    info!(
        "Connected to {} (topic '{}' has {partitions} partitions, wait for ack: {})",
        args.kafka.broker_url, args.kafka.topic, args.wait_for_ack
    );

    let server_cancel = cancel.child_token();
    let server = serve_metrics(
        &args.metrics_addr,
        metrics.registry().clone(),
        server_cancel.clone(),
    )
    .await
    .context("Failed to start metrics endpoint")?;

    let result = run_producer(&publisher, &args.run_config(), &metrics, &cancel).await;

    server_cancel.cancel();
    server.join().await;

    let summary = result.context("Producer run failed")?;
    if !summary.cancelled {
        info!("Published {} records successfully", summary.submitted);
    }
    Ok(summary)
}
