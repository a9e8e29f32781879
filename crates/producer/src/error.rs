//! Error types for the producer.

use adstream_record::RecordError;
use rdkafka::error::KafkaError;
use thiserror::Error;

/// Failure to hand one record to the log transport.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Message rejected by producer: {0}")]
    Rejected(#[source] KafkaError),

    #[error("Message delivery failed: {0}")]
    Delivery(#[source] KafkaError),

    #[error("Delivery report dropped before completion")]
    Canceled,

    #[error("Failed to flush producer: {0}")]
    Flush(#[source] KafkaError),
}

#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    #[error("Invalid rate {0}: must be a positive, finite number of records per second")]
    InvalidRate(f64),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("Aborting after {count} consecutive submission failures (last: {last})")]
    TooManyFailures { count: u64, last: String },

    #[error("Topic creation error: {0}")]
    TopicCreation(String),

    #[error("Broker metadata probe failed: {0}")]
    Unreachable(String),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}
