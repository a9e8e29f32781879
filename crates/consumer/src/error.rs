use rdkafka::error::KafkaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Broker metadata probe failed: {0}")]
    Unreachable(String),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Failure of one batch processing call.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Batch processing cancelled")]
    Cancelled,

    #[error("Batch processing failed: {0}")]
    Failed(String),
}
