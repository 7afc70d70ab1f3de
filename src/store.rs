//! Top-level entry point that composes the transport, id allocation, and
//! document writes into a single [`EventStore`] type.
//!
//! Writes go through a [`DocumentStore`]; reads are range scans over the
//! `aggregate` and `name` views. Multi-name reads fan out one view query
//! per name and merge the results in input order.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::config::CouchConfig;
use crate::document::{CouchDocuments, DocumentStore};
use crate::error::{Error, Result};
use crate::event::EventRecord;
use crate::transport::{HttpTransport, RequestOptions, Transport};
use crate::uuids::ServerIds;
use crate::view::{ViewQuery, parse_events};

/// One event name or an ordered list of them.
///
/// Built implicitly from `&str`, `String`, or any list of names, so
/// [`EventStore::get_events_by_name`] accepts either form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventNames {
    /// A single name: one view query.
    One(String),
    /// Several names: one concurrent view query per name.
    Many(Vec<String>),
}

impl From<&str> for EventNames {
    fn from(name: &str) -> Self {
        Self::One(name.to_owned())
    }
}

impl From<String> for EventNames {
    fn from(name: String) -> Self {
        Self::One(name)
    }
}

impl From<Vec<String>> for EventNames {
    fn from(names: Vec<String>) -> Self {
        Self::Many(names)
    }
}

impl From<Vec<&str>> for EventNames {
    fn from(names: Vec<&str>) -> Self {
        Self::Many(names.into_iter().map(str::to_owned).collect())
    }
}

impl From<&[&str]> for EventNames {
    fn from(names: &[&str]) -> Self {
        Self::Many(names.iter().map(|n| (*n).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for EventNames {
    fn from(names: [&str; N]) -> Self {
        Self::Many(names.iter().map(|n| (*n).to_owned()).collect())
    }
}

struct StoreInner {
    transport: Arc<dyn Transport>,
    documents: Arc<dyn DocumentStore>,
    database: String,
    design: String,
}

/// Appends events to CouchDB and reads them back through its views.
///
/// `Clone` is cheap -- all internal state is `Arc`-wrapped, and clones
/// share the same transport and connection pool.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> couch_es::Result<()> {
/// use couch_es::{CouchConfig, EventStore};
/// use serde_json::json;
///
/// let store = EventStore::connect(CouchConfig::builder("cqrs").build())?;
/// store.store_event(1, "user:created", json!({"foo": "bar"})).await?;
/// let history = store.get_events_by_aggregate(1).await?;
/// let feed = store.get_events_by_name(["user:created", "user:renamed"]).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EventStore {
    inner: Arc<StoreInner>,
}

impl fmt::Debug for EventStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStore")
            .field("database", &self.inner.database)
            .field("design", &self.inner.design)
            .finish()
    }
}

impl EventStore {
    /// Build a store talking HTTP to the server described by `config`.
    ///
    /// Wires an [`HttpTransport`], a [`ServerIds`] allocator, and
    /// [`CouchDocuments`] over the same transport. No request is sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn connect(config: CouchConfig) -> Result<Self> {
        let database = config.database.clone();
        let design = config.design.clone();
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config)?);
        let ids = Arc::new(ServerIds::new(transport.clone()));
        let documents = Arc::new(CouchDocuments::new(transport.clone(), ids, &database));
        Ok(Self::from_parts(transport, documents, database, design))
    }

    /// Build a store from explicitly supplied collaborators.
    ///
    /// # Arguments
    ///
    /// * `transport` - Issues the view queries.
    /// * `documents` - Persists serialized events; any driver satisfying
    ///   [`DocumentStore`] may stand in for [`CouchDocuments`].
    /// * `database` - Database holding the design document.
    /// * `design` - Design document defining the `aggregate` and `name` views.
    pub fn from_parts(
        transport: Arc<dyn Transport>,
        documents: Arc<dyn DocumentStore>,
        database: impl Into<String>,
        design: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                transport,
                documents,
                database: database.into(),
                design: design.into(),
            }),
        }
    }

    /// Database name.
    pub fn database(&self) -> &str {
        &self.inner.database
    }

    /// Design document name.
    pub fn design(&self) -> &str {
        &self.inner.design
    }

    /// Returns `true` if both handles share the same underlying store.
    pub fn same_store(&self, other: &EventStore) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Append a new event stamped with the current time.
    ///
    /// The document id is allocated by the document store.
    ///
    /// # Returns
    ///
    /// The server's write response body.
    ///
    /// # Errors
    ///
    /// Id allocation, encoding, or transport errors.
    pub async fn store_event(
        &self,
        aggregate_id: impl Into<Value>,
        name: impl Into<String>,
        attrs: Value,
    ) -> Result<String> {
        let record = EventRecord::new(aggregate_id, name, attrs);
        self.store_record(&record).await
    }

    /// Append a pre-built record as-is.
    ///
    /// # Errors
    ///
    /// Same as [`store_event`](Self::store_event).
    pub async fn store_record(&self, record: &EventRecord) -> Result<String> {
        let body = record.to_json()?;
        let response = self.inner.documents.create_document(None, body).await?;
        tracing::info!(name = %record.name, time = record.time, "event stored");
        Ok(response)
    }

    /// Delete a stored event document at revision `rev`.
    ///
    /// # Errors
    ///
    /// Transport errors, including `409` for a stale revision.
    pub async fn delete_event(&self, id: &str, rev: &str) -> Result<String> {
        self.inner.documents.delete_document(id, rev).await
    }

    /// All events of one aggregate, in ascending time order.
    ///
    /// # Errors
    ///
    /// Transport errors, or [`Error::Decode`] if the view response is
    /// malformed.
    pub async fn get_events_by_aggregate(
        &self,
        aggregate_id: impl Into<Value>,
    ) -> Result<Vec<EventRecord>> {
        self.query(ViewQuery::by_aggregate(aggregate_id)).await
    }

    /// All events with the given name or names.
    ///
    /// For several names, every view query is started before any is
    /// awaited, and the call completes once, after all of them settle.
    /// Results are concatenated in the order the names were given; within
    /// one name they stay in ascending time order. An empty list issues no
    /// request.
    ///
    /// # Errors
    ///
    /// For a single name, the query's own error. For several names,
    /// [`Error::SubQuery`] carrying the first failing name in input order;
    /// no partial results are returned.
    pub async fn get_events_by_name(
        &self,
        names: impl Into<EventNames>,
    ) -> Result<Vec<EventRecord>> {
        match names.into() {
            EventNames::One(name) => self.query(ViewQuery::by_name(&name)).await,
            EventNames::Many(names) => self.fan_out(names).await,
        }
    }

    async fn fan_out(&self, names: Vec<String>) -> Result<Vec<EventRecord>> {
        tracing::debug!(count = names.len(), "fanning out name queries");
        let pending = names
            .iter()
            .map(|name| self.query(ViewQuery::by_name(name)));
        let settled = futures::future::join_all(pending).await;

        let mut events = Vec::new();
        let mut first_error = None;
        for (name, result) in names.into_iter().zip(settled) {
            match result {
                Ok(rows) => events.extend(rows),
                Err(err) => {
                    tracing::warn!(%name, error = %err, "name query failed");
                    if first_error.is_none() {
                        first_error = Some(Error::SubQuery {
                            name,
                            source: Box::new(err),
                        });
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                tracing::debug!(rows = events.len(), "name queries merged");
                Ok(events)
            }
        }
    }

    async fn query(&self, query: ViewQuery) -> Result<Vec<EventRecord>> {
        let path = query.path(&self.inner.database, &self.inner.design);
        let body = self.inner.transport.request(RequestOptions::get(path)).await?;
        parse_events(&body)
    }
}
