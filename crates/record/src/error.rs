//! Error types for record encoding and decoding.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Failed to encode record {record_id}: {source}")]
    Encode {
        record_id: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode record payload: {0}")]
    Decode(#[from] serde_json::Error),
}
