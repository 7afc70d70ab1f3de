//! The persisted event record and its wire shape.
//!
//! No network I/O occurs here.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Discriminator stored in the `type` field of every event document.
pub const EVENT_TYPE: &str = "event";

fn default_kind() -> String {
    EVENT_TYPE.to_owned()
}

/// Milliseconds since the Unix epoch, from the local wall clock.
///
/// A clock set before 1970 reads as `0`.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One immutable domain event as stored in CouchDB.
///
/// Serializes to exactly
/// `{"aggregateId":..,"name":..,"type":"event","time":..,"attrs":..}`,
/// in that field order. Identity belongs to the document (`_id`/`_rev`),
/// not to any field here.
///
/// # Examples
///
/// ```
/// use couch_es::EventRecord;
/// use serde_json::json;
///
/// let record = EventRecord::at(1, "user:created", json!({"foo": "bar"}), 123456);
/// assert_eq!(
///     record.to_json().unwrap(),
///     r#"{"aggregateId":1,"name":"user:created","type":"event","time":123456,"attrs":{"foo":"bar"}}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Caller-supplied aggregate identifier; any JSON scalar or structure.
    pub aggregate_id: Value,
    /// Event name (e.g. `"user:created"`).
    pub name: String,
    /// Always [`EVENT_TYPE`].
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    /// Write time in milliseconds since the Unix epoch.
    pub time: u64,
    /// Event payload.
    #[serde(default)]
    pub attrs: Value,
}

impl EventRecord {
    /// Create a record stamped with the current wall-clock time.
    pub fn new(aggregate_id: impl Into<Value>, name: impl Into<String>, attrs: Value) -> Self {
        Self::at(aggregate_id, name, attrs, now_millis())
    }

    /// Create a record with an explicit timestamp.
    pub fn at(
        aggregate_id: impl Into<Value>,
        name: impl Into<String>,
        attrs: Value,
        time: u64,
    ) -> Self {
        Self {
            aggregate_id: aggregate_id.into(),
            name: name.into(),
            kind: default_kind(),
            time,
            attrs,
        }
    }

    /// Serialize to the compact JSON document body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`] if `attrs` holds a value JSON cannot
    /// represent (in practice only non-string map keys from a custom
    /// `Serialize` impl reach this).
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::Encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_fields_in_document_order() {
        let record = EventRecord::at(1, "user:created", json!({"foo": "bar"}), 123456);
        let body = record.to_json().expect("record should serialize");
        assert_eq!(
            body,
            r#"{"aggregateId":1,"name":"user:created","type":"event","time":123456,"attrs":{"foo":"bar"}}"#
        );
    }

    #[test]
    fn new_stamps_current_time() {
        let before = now_millis();
        let record = EventRecord::new("a-1", "user:renamed", Value::Null);
        let after = now_millis();
        assert!(record.time >= before && record.time <= after);
        assert_eq!(record.kind, EVENT_TYPE);
        assert_eq!(record.aggregate_id, json!("a-1"));
    }

    #[test]
    fn deserializes_stored_document() {
        let raw = r#"{"_id":"x","_rev":"1-a","aggregateId":7,"name":"n","type":"event","time":5,"attrs":[1,2]}"#;
        let record: EventRecord = serde_json::from_str(raw).expect("document should decode");
        assert_eq!(record, EventRecord::at(7, "n", json!([1, 2]), 5));
    }

    #[test]
    fn missing_type_and_attrs_default() {
        let raw = r#"{"aggregateId":"a","name":"n","time":1}"#;
        let record: EventRecord = serde_json::from_str(raw).expect("projection should decode");
        assert_eq!(record.kind, EVENT_TYPE);
        assert_eq!(record.attrs, Value::Null);
    }

    #[test]
    fn missing_name_is_rejected() {
        let raw = r#"{"aggregateId":"a","time":1}"#;
        assert!(serde_json::from_str::<EventRecord>(raw).is_err());
    }
}
