//! Synthetic record generation.

use crate::record::PiiRecord;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

/// Upper bound (exclusive) of the numeric part of `household_id`.
pub const HOUSEHOLD_ID_RANGE: u32 = 99_999;
/// Number of distinct audience segments.
pub const SEGMENT_COUNT: u32 = 50;

/// Build the record for `record_id`, drawing the random fields from `rng`.
pub fn generate_with<R: Rng>(rng: &mut R, record_id: u64) -> PiiRecord {
    PiiRecord {
        record_id,
        advertising_id: random_uuid(rng).to_string(),
        cookie_id: random_uuid(rng).to_string(),
        device_id: random_uuid(rng).to_string(),
        household_id: format!("HH-{}", rng.random_range(0..HOUSEHOLD_ID_RANGE)),
        segment: format!("segment-{}", rng.random_range(0..SEGMENT_COUNT)),
        timestamp: Utc::now(),
    }
}

/// Build the record for `record_id` using the thread-local RNG.
pub fn generate_record(record_id: u64) -> PiiRecord {
    generate_with(&mut rand::rng(), record_id)
}

fn random_uuid<R: Rng>(rng: &mut R) -> Uuid {
    uuid::Builder::from_random_bytes(rng.random()).into_uuid()
}

/// Record generator owning its RNG.
///
/// A seeded generator reproduces the same random fields for the same
/// sequence of calls; the timestamp is always the wall-clock time of the call.
pub struct RecordGenerator {
    rng: StdRng,
}

impl RecordGenerator {
    /// Create a generator, seeded when `seed` is given and from OS entropy otherwise.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }

    pub fn generate(&mut self, record_id: u64) -> PiiRecord {
        generate_with(&mut self.rng, record_id)
    }
}
