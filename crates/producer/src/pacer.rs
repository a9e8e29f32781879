//! Paced clock for steady-state emission.

use crate::error::ProducerError;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// About thirty years; stands in for deadlines that would overflow `Instant`.
pub const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Schedules tick `i` at `start + i / rate`.
///
/// Deadlines are computed from the fixed start instant rather than from the
/// previous tick, so jitter does not accumulate. A tick whose deadline has
/// already passed returns immediately; the number of ticks completed by time
/// `t` never exceeds `floor(t * rate) + 1`.
#[derive(Debug)]
pub struct Pacer {
    start: Instant,
    rate_per_second: f64,
    next: u64,
}

impl Pacer {
    pub fn new(rate_per_second: f64) -> Result<Self, ProducerError> {
        Self::starting_at(Instant::now(), rate_per_second)
    }

    pub fn starting_at(start: Instant, rate_per_second: f64) -> Result<Self, ProducerError> {
        if !(rate_per_second.is_finite() && rate_per_second > 0.0) {
            return Err(ProducerError::InvalidRate(rate_per_second));
        }
        Ok(Self {
            start,
            rate_per_second,
            next: 0,
        })
    }

    /// Offset of tick `index` from the start instant.
    ///
    /// Saturates at `Duration::MAX` for offsets a `Duration` cannot hold.
    pub fn offset(&self, index: u64) -> Duration {
        Duration::try_from_secs_f64(index as f64 / self.rate_per_second).unwrap_or(Duration::MAX)
    }

    /// Instant tick `index` is due; offsets past what the clock can represent
    /// map to [`FAR_FUTURE`] after the start.
    pub fn deadline(&self, index: u64) -> Instant {
        let offset = self.offset(index);
        self.start
            .checked_add(offset)
            .unwrap_or_else(|| self.start + FAR_FUTURE)
    }

    /// Wait for the next scheduled instant and return its index.
    ///
    /// Cancel safe: if the returned future is dropped before completion the
    /// same tick is awaited again on the next call.
    pub async fn tick(&mut self) -> u64 {
        let index = self.next;
        sleep_until(self.deadline(index)).await;
        self.next += 1;
        index
    }

    /// Number of ticks completed so far.
    pub fn completed(&self) -> u64 {
        self.next
    }
}
