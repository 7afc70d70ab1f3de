//! View (secondary index) query paths and response decoding.
//!
//! Both views are keyed `[prefix, time]`, so a scan from `[prefix, 0]` to
//! `[prefix, MAX_TIME]` returns every event for that prefix in ascending
//! time order.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::event::EventRecord;
use crate::transport::encode_component;

/// Upper time bound for range scans; larger than any realistic
/// millisecond timestamp.
pub const MAX_TIME: u64 = 9_999_999_999_999;

/// The two views an event design document must define.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewIndex {
    /// Keyed `[aggregateId, time]`.
    Aggregate,
    /// Keyed `[name, time]`.
    Name,
}

impl ViewIndex {
    /// View name inside the design document.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aggregate => "aggregate",
            Self::Name => "name",
        }
    }
}

/// Inclusive `startkey`/`endkey` pair for a view scan.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRange {
    /// `[prefix, 0]`
    pub start: Value,
    /// `[prefix, MAX_TIME]`
    pub end: Value,
}

impl KeyRange {
    /// Range covering every timestamp under `prefix`.
    pub fn for_prefix(prefix: Value) -> Self {
        Self {
            start: json!([prefix.clone(), 0]),
            end: json!([prefix, MAX_TIME]),
        }
    }
}

/// A range query against one view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewQuery {
    /// Which view to scan.
    pub index: ViewIndex,
    /// Key bounds.
    pub range: KeyRange,
}

impl ViewQuery {
    /// All events of one aggregate.
    pub fn by_aggregate(aggregate_id: impl Into<Value>) -> Self {
        Self {
            index: ViewIndex::Aggregate,
            range: KeyRange::for_prefix(aggregate_id.into()),
        }
    }

    /// All events with one name.
    pub fn by_name(name: &str) -> Self {
        Self {
            index: ViewIndex::Name,
            range: KeyRange::for_prefix(Value::String(name.to_owned())),
        }
    }

    /// Request path, with the range bounds as percent-encoded compact JSON.
    ///
    /// # Examples
    ///
    /// ```
    /// use couch_es::ViewQuery;
    ///
    /// assert_eq!(
    ///     ViewQuery::by_aggregate(1).path("cqrs", "cqrs"),
    ///     "/cqrs/_design/cqrs/_view/aggregate?startkey=%5B1%2C0%5D&endkey=%5B1%2C9999999999999%5D"
    /// );
    /// ```
    pub fn path(&self, database: &str, design: &str) -> String {
        format!(
            "/{}/_design/{}/_view/{}?startkey={}&endkey={}",
            encode_component(database),
            encode_component(design),
            self.index.as_str(),
            encode_component(&self.range.start.to_string()),
            encode_component(&self.range.end.to_string()),
        )
    }
}

/// One row of a view response.
///
/// Only `value` is required; other row fields CouchDB or a custom view
/// emits are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewRow<T> {
    /// Source document id (`id`, or `_id` in hand-built rows).
    #[serde(default, alias = "_id")]
    pub id: Option<Value>,
    /// Emitted key.
    #[serde(default)]
    pub key: Option<Value>,
    /// Emitted value.
    pub value: T,
}

/// Envelope of a view response.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewResponse<T> {
    /// Total rows in the view, when the server reports it.
    #[serde(default)]
    pub total_rows: Option<u64>,
    /// Offset of the first returned row, when the server reports it.
    #[serde(default)]
    pub offset: Option<u64>,
    /// Rows in index order.
    pub rows: Vec<ViewRow<T>>,
}

/// Decode a raw view response body.
///
/// # Errors
///
/// Returns [`Error::Decode`] if `raw` is not JSON, has no `rows` array, or
/// a row's `value` does not decode as `T`.
pub fn parse_view<T: DeserializeOwned>(raw: &str) -> Result<ViewResponse<T>> {
    serde_json::from_str(raw).map_err(|e| Error::decode("view response", e))
}

/// Decode a raw view response body into event records, in row order.
///
/// # Errors
///
/// Same as [`parse_view`]; a malformed body never yields partial results.
pub fn parse_events(raw: &str) -> Result<Vec<EventRecord>> {
    let response = parse_view::<EventRecord>(raw)?;
    Ok(response.rows.into_iter().map(|row| row.value).collect())
}
