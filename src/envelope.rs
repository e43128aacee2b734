//! Batch envelope unwrapping
//!
//! The queueing layer delivers a batch of message records whose bodies are
//! JSON-encoded storage events (one extra wrapping level). Unwrapping flattens
//! the batch into an ordered list of work items with percent-decoded keys.

use percent_encoding::percent_decode_str;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("object key is not valid UTF-8 after decoding: {key}")]
    InvalidKey { key: String },
}

/// Outer batch message delivered by the queueing layer
#[derive(Debug, Deserialize)]
pub struct BatchEnvelope {
    #[serde(rename = "Records")]
    pub records: Vec<MessageRecord>,
}

/// One queued message; `body` carries a JSON-encoded storage event
#[derive(Debug, Deserialize)]
pub struct MessageRecord {
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct StorageEvent {
    #[serde(rename = "Records")]
    records: Vec<StorageEventRecord>,
}

#[derive(Debug, Deserialize)]
struct StorageEventRecord {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
}

/// One decoded image reference extracted from an envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub bucket: String,
    pub source_key: String,
}

impl BatchEnvelope {
    /// Flatten the envelope into work items, in arrival order.
    ///
    /// Any parse or decoding failure here is fatal to the whole batch: no
    /// item list can be established, so the caller must leave the batch
    /// unacknowledged for redelivery.
    pub fn work_items(&self) -> Result<Vec<WorkItem>, EnvelopeError> {
        let mut items = Vec::new();

        for record in &self.records {
            let event: StorageEvent = serde_json::from_str(&record.body)?;

            for event_record in event.records {
                items.push(WorkItem {
                    bucket: event_record.s3.bucket.name,
                    source_key: decode_key(&event_record.s3.object.key)?,
                });
            }
        }

        Ok(items)
    }
}

/// Decode a percent-encoded object key, treating `+` as space
pub fn decode_key(raw: &str) -> Result<String, EnvelopeError> {
    // Literal plus signs become spaces before percent-decoding, so an
    // encoded plus (%2B) survives as '+'.
    let unplussed = raw.replace('+', " ");

    percent_decode_str(&unplussed)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| EnvelopeError::InvalidKey {
            key: raw.to_string(),
        })
}
