//! `rdkafka` implementation of [`Publisher`] plus topic administration.

use crate::error::{ProducerError, PublishError};
use crate::publisher::Publisher;
use adstream_metrics::ProducerMetrics;
use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{DeliveryFuture, FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Pause between enqueue attempts while the local producer queue is full.
const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(10);

/// Configuration for [`KafkaPublisher`].
#[derive(Debug, Clone)]
pub struct KafkaPublisherConfig {
    /// Kafka brokers (comma-separated list)
    pub brokers: String,
    /// Topic every record is published to
    pub topic: String,
    /// Broker acknowledgment level (`acks`): "0", "1" or "all"
    pub acks: String,
    /// Compression codec (`compression.type`)
    pub compression: String,
    /// Time the client waits to fill a batch before sending (`linger.ms`)
    pub linger_ms: u64,
    /// Upper bound on delivery time including retries (`message.timeout.ms`)
    pub message_timeout: Duration,
    /// How long `publish` keeps retrying while the local queue is full
    pub enqueue_timeout: Duration,
    /// Await the broker acknowledgment inside `publish`
    ///
    /// When false, delivery reports are collected in the background and
    /// failures only show up in `producer_delivery_failures_total`.
    pub wait_for_ack: bool,
}

impl Default for KafkaPublisherConfig {
    fn default() -> Self {
        Self {
            brokers: "kafka:9092".to_string(),
            topic: "ad_pii_topic".to_string(),
            acks: "1".to_string(),
            compression: "lz4".to_string(),
            linger_ms: 5,
            message_timeout: Duration::from_secs(30),
            enqueue_timeout: Duration::from_secs(5),
            wait_for_ack: false,
        }
    }
}

/// Asynchronous Kafka publisher.
///
/// In fire-and-forget mode every delivery report is awaited by a task on
/// `delivery_reports`; [`Publisher::flush`] waits for those tasks too.
pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
    enqueue_timeout: Duration,
    wait_for_ack: bool,
    metrics: Arc<ProducerMetrics>,
    delivery_reports: TaskTracker,
}

impl KafkaPublisher {
    pub fn new(
        config: &KafkaPublisherConfig,
        metrics: Arc<ProducerMetrics>,
    ) -> Result<Self, ProducerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("acks", &config.acks)
            .set("compression.type", &config.compression)
            .set("linger.ms", config.linger_ms.to_string())
            .set(
                "message.timeout.ms",
                config.message_timeout.as_millis().to_string(),
            )
            .set("queue.buffering.max.messages", "100000")
            .create()?;

        Ok(Self {
            producer,
            topic: config.topic.clone(),
            enqueue_timeout: config.enqueue_timeout,
            wait_for_ack: config.wait_for_ack,
            metrics,
            delivery_reports: TaskTracker::new(),
        })
    }

    /// Fetch the topic metadata once, failing if the broker cannot be reached
    /// or does not know the topic. Returns the partition count.
    pub async fn probe(&self, timeout: Duration) -> Result<usize, ProducerError> {
        let producer = self.producer.clone();
        let topic = self.topic.clone();

        let metadata = tokio::task::spawn_blocking(move || {
            producer.client().fetch_metadata(Some(topic.as_str()), timeout)
        })
        .await?
        .map_err(|e| ProducerError::Unreachable(e.to_string()))?;

        let topic_metadata = metadata
            .topics()
            .iter()
            .find(|t| t.name() == self.topic)
            .ok_or_else(|| ProducerError::Unreachable(format!("topic '{}' missing", self.topic)))?;
        if let Some(err) = topic_metadata.error() {
            return Err(ProducerError::Unreachable(format!(
                "topic '{}': {:?}",
                self.topic, err
            )));
        }

        Ok(topic_metadata.partitions().len())
    }

    fn enqueue(&self, key: &str, payload: &[u8]) -> Result<DeliveryFuture, KafkaError> {
        self.producer
            .send_result(FutureRecord::to(&self.topic).key(key).payload(payload))
            .map_err(|(err, _)| err)
    }
}

fn is_queue_full(err: &KafkaError) -> bool {
    matches!(
        err,
        KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull)
    )
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn publish(&self, key: &str, payload: &[u8]) -> Result<(), PublishError> {
        let started = Instant::now();
        let delivery = loop {
            match self.enqueue(key, payload) {
                Ok(delivery) => break delivery,
                Err(err) if is_queue_full(&err) && started.elapsed() < self.enqueue_timeout => {
                    tokio::time::sleep(QUEUE_FULL_BACKOFF).await;
                }
                Err(err) => return Err(PublishError::Rejected(err)),
            }
        };

        if self.wait_for_ack {
            return match delivery.await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err((err, _))) => Err(PublishError::Delivery(err)),
                Err(_) => Err(PublishError::Canceled),
            };
        }

        let failures = self.metrics.delivery_failures.clone();
        let key = key.to_string();
        self.delivery_reports.spawn(async move {
            match delivery.await {
                Ok(Ok(_)) => {}
                Ok(Err((err, _))) => {
                    failures.inc();
                    warn!("Delivery failed for record {key}: {err}");
                }
                Err(_) => {
                    failures.inc();
                    warn!("Delivery report for record {key} dropped");
                }
            }
        });

        Ok(())
    }

    async fn flush(&self, timeout: Duration) -> Result<(), PublishError> {
        let producer = self.producer.clone();
        let started = Instant::now();
        debug!("Flushing producer (timeout {timeout:?})");
        let flushed = tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|_| PublishError::Canceled)?;

        // Delivery reports resolved by the flush are accounted before returning.
        self.delivery_reports.close();
        let remaining = timeout.saturating_sub(started.elapsed());
        if tokio::time::timeout(remaining, self.delivery_reports.wait())
            .await
            .is_err()
        {
            warn!(
                "{} delivery reports still pending after flush",
                self.delivery_reports.len()
            );
        }
        self.delivery_reports.reopen();

        flushed.map_err(PublishError::Flush)
    }
}

/// Create `topic` with `partitions` partitions unless it already exists.
pub async fn create_topic_if_not_exists(
    brokers: &str,
    topic: &str,
    partitions: i32,
    timeout: Duration,
) -> Result<(), ProducerError> {
    let admin_client: AdminClient<DefaultClientContext> = ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .create()?;

    let new_topic = NewTopic::new(topic, partitions, TopicReplication::Fixed(1));
    let opts = AdminOptions::new().operation_timeout(Some(timeout));

    let results = admin_client
        .create_topics(&[new_topic], &opts)
        .await
        .map_err(|e| ProducerError::TopicCreation(format!("Failed to create topic: {e}")))?;

    for result in results {
        match result {
            Ok(topic_name) => info!("Topic '{topic_name}' created with {partitions} partitions"),
            Err((topic_name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                info!("Topic '{topic_name}' already exists");
            }
            Err((topic_name, err)) => {
                return Err(ProducerError::TopicCreation(format!(
                    "Failed to create topic {topic_name}: {err}"
                )));
            }
        }
    }

    Ok(())
}
