//! Rate-limited producer for the adstream load test.
//!
//! The producer is a single cooperative loop:
//!
//! ```text
//! Pacer ──tick──► RecordGenerator ──encode──► Publisher ──► Kafka
//!                                                 │
//!                                                 └──► ProducerMetrics
//! ```
//!
//! [`Pacer`] schedules emission `i` at `start + i / rate`, so a slow iteration
//! never shifts the schedule of later ones. [`Publisher`] is the seam to the
//! log transport; [`KafkaPublisher`] is the `rdkafka` implementation and by
//! default does not wait for broker acknowledgment.

pub mod error;
pub mod kafka;
pub mod pacer;
pub mod publisher;
pub mod runner;

pub use error::{ProducerError, PublishError};
pub use kafka::{create_topic_if_not_exists, KafkaPublisher, KafkaPublisherConfig};
pub use pacer::{Pacer, FAR_FUTURE};
pub use publisher::Publisher;
pub use runner::{run_producer, ProduceSummary, RunConfig};
