//! Metrics sinks for the adstream producer and consumer roles.
//!
//! Each role owns one explicitly constructed sink backed by its own
//! [`prometheus::Registry`]. Sinks are shared through `Arc` and every handle
//! they expose is internally synchronized, so callers increment and observe
//! without any locking of their own.
//!
//! [`serve_metrics`] exposes a registry in the Prometheus text format on
//! `GET /metrics`.

pub mod consumer;
pub mod error;
pub mod producer;
pub mod server;

pub use consumer::ConsumerMetrics;
pub use error::MetricsError;
pub use producer::ProducerMetrics;
pub use server::{render, serve_metrics, MetricsServer, METRICS_PATH};
