//! Event-sourcing persistence on top of CouchDB's HTTP interface.
//!
//! Events are stored as documents and read back through two range-queryable
//! views, `aggregate` (keyed `[aggregateId, time]`) and `name` (keyed
//! `[name, time]`).

mod config;
pub use config::{CouchConfig, CouchConfigBuilder, Credentials, DEFAULT_HOST, DEFAULT_PORT};
mod document;
pub use document::{CouchDocuments, DocumentStore};
mod error;
pub use error::{Error, Result};
mod event;
pub use event::{EVENT_TYPE, EventRecord, now_millis};
pub mod global;
mod store;
pub use store::{EventNames, EventStore};
mod transport;
pub use transport::{
    HttpTransport, Method, RequestOptions, Transport, basic_auth_value, collect_body,
};
mod uuids;
pub use uuids::{IdProvider, LocalIds, ServerIds, UUIDS_PATH};
mod view;
pub use view::{
    KeyRange, MAX_TIME, ViewIndex, ViewQuery, ViewResponse, ViewRow, parse_events, parse_view,
};

#[cfg(test)]
mod testing;
