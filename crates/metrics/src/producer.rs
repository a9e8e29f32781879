//! Producer-side metrics.

use crate::error::MetricsError;
use prometheus::{IntCounter, Opts, Registry};

/// Counters updated by the publishing loop and the delivery reporters.
#[derive(Clone)]
pub struct ProducerMetrics {
    registry: Registry,
    /// Records accepted by the transport.
    pub messages_produced: IntCounter,
    /// Records the transport refused to accept.
    pub send_failures: IntCounter,
    /// Records accepted but later reported as undelivered by the broker.
    pub delivery_failures: IntCounter,
}

impl ProducerMetrics {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let messages_produced = IntCounter::with_opts(Opts::new(
            "producer_messages_total",
            "Total messages produced",
        ))?;
        let send_failures = IntCounter::with_opts(Opts::new(
            "producer_send_failures_total",
            "Messages rejected by the producer before transmission",
        ))?;
        let delivery_failures = IntCounter::with_opts(Opts::new(
            "producer_delivery_failures_total",
            "Messages reported as undelivered by the broker",
        ))?;

        registry.register(Box::new(messages_produced.clone()))?;
        registry.register(Box::new(send_failures.clone()))?;
        registry.register(Box::new(delivery_failures.clone()))?;

        Ok(Self {
            registry,
            messages_produced,
            send_failures,
            delivery_failures,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
