//! Record model for the adstream load-test pipeline.
//!
//! The producer side generates [`PiiRecord`]s and publishes them as JSON. The
//! consumer side only needs the identifying subset of the payload, so it
//! decodes into [`ConsumedRecord`] and ignores every other field.
//!
//! ```text
//! RecordGenerator ──► PiiRecord ──encode──► JSON bytes ──► Kafka
//!                                                            │
//!                      ConsumedRecord ◄──decode──────────────┘
//! ```

pub mod error;
pub mod generator;
pub mod record;

pub use error::RecordError;
pub use generator::{generate_record, generate_with, RecordGenerator};
pub use record::{ConsumedRecord, PiiRecord};
