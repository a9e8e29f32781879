//! adstream: a synthetic load generator and batch-ingestion harness for Kafka.
//!
//! # Roles
//!
//! - `produce`: emit synthetic ad PII records to one topic at a fixed rate
//! - `consume`: read every partition of the topic in parallel, process the
//!   records in fixed-size batches behind an artificial per-batch delay
//!
//! Both roles expose Prometheus counters over HTTP on `/metrics`.
//!
//! # CLI Usage
//!
//! ```bash
//! # 130 records/sec until 10M records have been produced
//! adstream produce --broker-url kafka:9092 --rate 130 --total-count 10000000
//!
//! # Batches of 10k records, 30s of simulated work per batch
//! adstream consume --broker-url kafka:9092 --batch-size 10000 --batch-delay 30s
//! ```
//!
//! Every option can also be given through the environment variable named in
//! `--help`.

use adstream_consumer::TrailingBatch;
use adstream_producer::{KafkaPublisherConfig, RunConfig};
use clap::{Args, ValueEnum};
use std::time::Duration;

pub mod consume;
pub mod duration;
pub mod produce;

use duration::parse_duration;

/// Connection options shared by both roles.
#[derive(Args, Clone, Debug)]
pub struct KafkaOpts {
    /// Kafka bootstrap servers (comma-separated)
    #[arg(long, env = "KAFKA_BROKER_URL", default_value = "kafka:9092")]
    pub broker_url: String,

    /// Topic records are produced to and consumed from
    #[arg(long, env = "KAFKA_TOPIC", default_value = "ad_pii_topic")]
    pub topic: String,

    /// How long to wait for broker metadata at startup
    #[arg(long, env = "KAFKA_CONNECT_TIMEOUT", default_value = "10s", value_parser = parse_duration)]
    pub connect_timeout: Duration,
}

/// Options for the `produce` role.
#[derive(Args, Clone, Debug)]
pub struct ProduceArgs {
    #[command(flatten)]
    pub kafka: KafkaOpts,

    /// Number of records to produce
    #[arg(long, env = "MESSAGES_PER_PRODUCER", default_value = "10000000")]
    pub total_count: u64,

    /// Maximum records per second
    #[arg(long, env = "RATE_LIMIT", default_value = "130")]
    pub rate: f64,

    /// Wait for the broker acknowledgment of every record before the next one
    #[arg(long, env = "WAIT_FOR_ACK")]
    pub wait_for_ack: bool,

    /// Broker acknowledgment level ("0", "1" or "all")
    #[arg(long, env = "PRODUCER_ACKS", default_value = "1")]
    pub acks: String,

    /// Compression codec for produced batches
    #[arg(long, env = "PRODUCER_COMPRESSION", default_value = "lz4")]
    pub compression: String,

    /// Milliseconds the client waits to fill a batch before sending
    #[arg(long, default_value = "5")]
    pub linger_ms: u64,

    /// Delivery timeout per record, retries included
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    pub message_timeout: Duration,

    /// How long a record may wait for room in the local producer queue
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub enqueue_timeout: Duration,

    /// Abort after this many consecutive submission failures (0 = never)
    #[arg(long, default_value = "1000")]
    pub max_consecutive_failures: u64,

    /// Log a progress line every this many records (0 = never)
    #[arg(long, default_value = "10000")]
    pub progress_interval: u64,

    /// Seed for the random record fields (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Create the topic before producing if it does not exist
    #[arg(long)]
    pub create_topic: bool,

    /// Partition count used with --create-topic
    #[arg(long, default_value = "3")]
    pub partitions: i32,

    /// Listen address of the metrics endpoint
    #[arg(long, env = "PRODUCER_METRICS_ADDR", default_value = "0.0.0.0:2112")]
    pub metrics_addr: String,
}

impl ProduceArgs {
    pub fn publisher_config(&self) -> KafkaPublisherConfig {
        KafkaPublisherConfig {
            brokers: self.kafka.broker_url.clone(),
            topic: self.kafka.topic.clone(),
            acks: self.acks.clone(),
            compression: self.compression.clone(),
            linger_ms: self.linger_ms,
            message_timeout: self.message_timeout,
            enqueue_timeout: self.enqueue_timeout,
            wait_for_ack: self.wait_for_ack,
        }
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            total_count: self.total_count,
            rate_per_second: self.rate,
            max_consecutive_failures: self.max_consecutive_failures,
            progress_interval: self.progress_interval,
            flush_timeout: self.message_timeout,
            seed: self.seed,
        }
    }
}

/// What the consumer does with a partial batch when a partition closes.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrailingBatchArg {
    /// Process it like a full batch
    Flush,
    /// Discard it
    Drop,
}

impl From<TrailingBatchArg> for TrailingBatch {
    fn from(arg: TrailingBatchArg) -> Self {
        match arg {
            TrailingBatchArg::Flush => TrailingBatch::Flush,
            TrailingBatchArg::Drop => TrailingBatch::Drop,
        }
    }
}

/// Options for the `consume` role.
#[derive(Args, Clone, Debug)]
pub struct ConsumeArgs {
    #[command(flatten)]
    pub kafka: KafkaOpts,

    /// Records per batch
    #[arg(long, env = "BATCH_SIZE", default_value = "10000")]
    pub batch_size: usize,

    /// Simulated processing time per batch
    #[arg(long, env = "BATCH_DELAY", default_value = "30s", value_parser = parse_duration)]
    pub batch_delay: Duration,

    /// Handling of the partial batch left when a partition closes
    #[arg(long, value_enum, default_value = "flush")]
    pub trailing_batch: TrailingBatchArg,

    /// Stop each partition once its end is reached instead of waiting for more records
    #[arg(long)]
    pub stop_at_eof: bool,

    /// Client group id (nothing is committed)
    #[arg(long, env = "KAFKA_GROUP_ID", default_value = "adstream-consumer")]
    pub group_id: String,

    /// Listen address of the metrics endpoint
    #[arg(long, env = "CONSUMER_METRICS_ADDR", default_value = "0.0.0.0:2113")]
    pub metrics_addr: String,
}
