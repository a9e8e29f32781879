//! Wire representation of a synthetic ad PII record.

use crate::error::RecordError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full record as emitted by the producer.
///
/// `record_id` is the logical sequence number the generator was asked for.
/// It is assigned once and never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiRecord {
    pub record_id: u64,
    pub advertising_id: String,
    pub cookie_id: String,
    pub device_id: String,
    pub household_id: String,
    pub segment: String,
    pub timestamp: DateTime<Utc>,
}

impl PiiRecord {
    /// Serialize the record into the JSON bytes published to the topic.
    pub fn encode(&self) -> Result<Vec<u8>, RecordError> {
        serde_json::to_vec(self).map_err(|source| RecordError::Encode {
            record_id: self.record_id,
            source,
        })
    }

    /// Message key used when publishing: the decimal sequence number.
    pub fn key(&self) -> String {
        self.record_id.to_string()
    }
}

/// Subset of a record the consumer relies on.
///
/// Unknown fields are ignored so producers can add fields without breaking
/// consumers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConsumedRecord {
    pub record_id: u64,
    pub advertising_id: String,
}

impl ConsumedRecord {
    pub fn decode(payload: &[u8]) -> Result<Self, RecordError> {
        Ok(serde_json::from_slice(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PiiRecord {
        PiiRecord {
            record_id: 42,
            advertising_id: "6f1c2b4e-8d1a-4c55-9e0b-0c1f2a3b4c5d".to_string(),
            cookie_id: "cookie".to_string(),
            device_id: "device".to_string(),
            household_id: "HH-123".to_string(),
            segment: "segment-7".to_string(),
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_encode_uses_wire_field_names() {
        let bytes = sample().encode().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["record_id"], 42);
        assert_eq!(value["advertising_id"], "6f1c2b4e-8d1a-4c55-9e0b-0c1f2a3b4c5d");
        assert_eq!(value["household_id"], "HH-123");
        assert_eq!(value["segment"], "segment-7");
        assert_eq!(value["timestamp"], "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_consumer_round_trip_keeps_identity() {
        let record = sample();
        let decoded = ConsumedRecord::decode(&record.encode().unwrap()).unwrap();

        assert_eq!(decoded.record_id, record.record_id);
        assert_eq!(decoded.advertising_id, record.advertising_id);
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let payload = br#"{"record_id":7,"advertising_id":"abc","campaign":"x","extra":{"a":1}}"#;
        let decoded = ConsumedRecord::decode(payload).unwrap();

        assert_eq!(
            decoded,
            ConsumedRecord {
                record_id: 7,
                advertising_id: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_decode_rejects_malformed_payloads() {
        assert!(ConsumedRecord::decode(b"not json").is_err());
        assert!(ConsumedRecord::decode(br#"{"record_id":1}"#).is_err());
        assert!(ConsumedRecord::decode(br#"{"record_id":"one","advertising_id":"a"}"#).is_err());
    }

    #[test]
    fn test_key_is_sequence_number() {
        assert_eq!(sample().key(), "42");
    }
}
