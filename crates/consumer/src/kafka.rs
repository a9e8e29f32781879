//! `rdkafka` partition sources.
//!
//! Every partition gets its own consumer with a manual assignment starting
//! at the oldest offset. No consumer group coordination takes place and no
//! offsets are committed.

use crate::error::ConsumerError;
use crate::source::{PartitionSource, RawMessage};
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for Kafka partition sources.
#[derive(Debug, Clone)]
pub struct KafkaSourceConfig {
    /// Kafka brokers (comma-separated list)
    pub brokers: String,
    /// Topic whose partitions are consumed
    pub topic: String,
    /// Client group id; only used to identify the client, nothing is committed
    pub group_id: String,
    /// Close a partition source once it reaches the end of its partition
    ///
    /// By default sources never close and keep waiting for new records.
    pub stop_at_eof: bool,
}

impl Default for KafkaSourceConfig {
    fn default() -> Self {
        Self {
            brokers: "kafka:9092".to_string(),
            topic: "ad_pii_topic".to_string(),
            group_id: "adstream-consumer".to_string(),
            stop_at_eof: false,
        }
    }
}

impl KafkaSourceConfig {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &self.group_id)
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", "earliest")
            .set("enable.partition.eof", self.stop_at_eof.to_string());
        config
    }
}

/// List the partition ids of the configured topic.
///
/// Fails when the broker cannot be reached within `timeout` or the topic is
/// unknown, which callers treat as fatal at startup.
pub async fn discover_partitions(
    config: &KafkaSourceConfig,
    timeout: Duration,
) -> Result<Vec<i32>, ConsumerError> {
    let client_config = config.client_config();
    let topic = config.topic.clone();

    let partitions = tokio::task::spawn_blocking(move || -> Result<Vec<i32>, ConsumerError> {
        let consumer: BaseConsumer = client_config.create()?;
        let metadata = consumer
            .fetch_metadata(Some(topic.as_str()), timeout)
            .map_err(|e| ConsumerError::Unreachable(e.to_string()))?;

        let topic_metadata = metadata
            .topics()
            .iter()
            .find(|t| t.name() == topic)
            .ok_or_else(|| ConsumerError::Unreachable(format!("topic '{topic}' missing")))?;
        if let Some(err) = topic_metadata.error() {
            return Err(ConsumerError::Unreachable(format!("topic '{topic}': {err:?}")));
        }

        let mut ids: Vec<i32> = topic_metadata.partitions().iter().map(|p| p.id()).collect();
        ids.sort_unstable();
        Ok(ids)
    })
    .await??;

    if partitions.is_empty() {
        return Err(ConsumerError::Unreachable(format!(
            "topic '{}' has no partitions",
            config.topic
        )));
    }

    info!(
        "Discovered {} partitions for topic '{}'",
        partitions.len(),
        config.topic
    );
    Ok(partitions)
}

/// Source reading one partition from the oldest available offset.
pub struct KafkaPartitionSource {
    consumer: StreamConsumer,
    partition: i32,
    stop_at_eof: bool,
}

impl KafkaPartitionSource {
    pub fn open(config: &KafkaSourceConfig, partition: i32) -> Result<Self, ConsumerError> {
        let consumer: StreamConsumer = config.client_config().create()?;

        let mut assignment = TopicPartitionList::new();
        assignment.add_partition_offset(&config.topic, partition, Offset::Beginning)?;
        consumer.assign(&assignment)?;

        debug!(
            "Assigned partition {partition} of '{}' from the oldest offset",
            config.topic
        );

        Ok(Self {
            consumer,
            partition,
            stop_at_eof: config.stop_at_eof,
        })
    }
}

#[async_trait]
impl PartitionSource for KafkaPartitionSource {
    fn partition(&self) -> i32 {
        self.partition
    }

    async fn recv(&mut self) -> Option<Result<RawMessage, ConsumerError>> {
        loop {
            match self.consumer.recv().await {
                Ok(msg) => {
                    return Some(Ok(RawMessage {
                        partition: msg.partition(),
                        offset: msg.offset(),
                        key: msg.key().map(<[u8]>::to_vec),
                        payload: msg.payload().map(<[u8]>::to_vec),
                    }));
                }
                Err(KafkaError::PartitionEOF(_)) if self.stop_at_eof => {
                    info!("Partition {} reached end of log", self.partition);
                    return None;
                }
                Err(KafkaError::PartitionEOF(_)) => continue,
                Err(e) => return Some(Err(ConsumerError::Kafka(e))),
            }
        }
    }
}
