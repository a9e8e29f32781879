//! Per-partition batch consumer for the adstream load test.
//!
//! One [`PartitionWorker`] runs per partition of the topic. Each worker owns
//! its [`PartitionSource`] and its batch buffer; workers share nothing but the
//! [`ConsumerMetrics`](adstream_metrics::ConsumerMetrics) sink and the
//! cancellation token.
//!
//! ```text
//!  partition 0 ──► PartitionWorker ──batch──► BatchProcessor
//!  partition 1 ──► PartitionWorker ──batch──► BatchProcessor
//!  partition N ──► PartitionWorker ──batch──► BatchProcessor
//!                        │
//!                        └──► ConsumerMetrics (shared)
//! ```
//!
//! Ordering holds within a partition only.

pub mod error;
pub mod kafka;
pub mod pool;
pub mod processor;
pub mod source;
pub mod worker;

pub use error::{ConsumerError, ProcessError};
pub use kafka::{discover_partitions, KafkaPartitionSource, KafkaSourceConfig};
pub use pool::{run_partition_workers, total_batches};
pub use processor::{BatchProcessor, ThrottleProcessor};
pub use source::{channel_source, ChannelSource, PartitionSource, RawMessage};
pub use worker::{PartitionWorker, TrailingBatch, WorkerConfig, WorkerExit, WorkerReport};
