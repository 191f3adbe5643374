//! Shared domain types for the companion offline submission queue.
//!
//! A queued submission is an opaque bag of scalar form fields plus the
//! bookkeeping the sync engine needs: a unique id, the enqueue timestamp,
//! a retry counter, and the last classified delivery error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Payload field carrying the client's consent flag.
///
/// Every queued payload includes this field so the backend can audit that
/// consent was granted at the moment of capture.
pub const CONSENT_FLAG_FIELD: &str = "consent_granted";

/// A single scalar form-field value.
///
/// Serialized untagged, so payloads round-trip as plain JSON objects of
/// strings, numbers, and booleans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Ordered field-name → scalar map submitted by the form layer.
pub type SubmissionFields = BTreeMap<String, FieldValue>;

/// Stamps the consent flag onto a set of form fields.
pub fn with_consent_flag(mut fields: SubmissionFields, granted: bool) -> SubmissionFields {
    fields.insert(CONSENT_FLAG_FIELD.to_string(), FieldValue::Bool(granted));
    fields
}

/// One entry in the persisted offline queue.
///
/// Items are FIFO by insertion and removed only after confirmed delivery.
/// Only the sync engine mutates an item, and only its retry metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Opaque unique id, also usable as an idempotency key by the backend.
    pub id: String,
    /// Capture time, serialized RFC 3339 UTC.
    pub enqueued_at_utc: DateTime<Utc>,
    /// Scalar form fields, always including [`CONSENT_FLAG_FIELD`].
    pub payload: SubmissionFields,
    /// Failed delivery attempts so far.
    pub retry_count: u32,
    /// Classified code of the most recent delivery failure.
    pub last_error_code: Option<String>,
}

impl QueueItem {
    /// Creates a fresh item with a random id and the current UTC time.
    pub fn new(payload: SubmissionFields) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            enqueued_at_utc: Utc::now(),
            payload,
            retry_count: 0,
            last_error_code: None,
        }
    }

    /// Records one failed delivery attempt with its classified code.
    pub fn record_failure(&mut self, code: impl Into<String>) {
        self.retry_count += 1;
        self.last_error_code = Some(code.into());
    }
}
