//! Opaque JSON document writes and deletes.

use std::sync::Arc;

use crate::error::Result;
use crate::transport::{RequestOptions, Transport, encode_component};
use crate::uuids::IdProvider;

/// Create/delete contract shared by every document backend.
///
/// Bodies are caller-serialized JSON passed through verbatim, and the
/// server's response body is returned unchanged.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write `body` as a new document.
    ///
    /// With `id == None`, exactly one fresh id is allocated first and the
    /// write is issued only after it arrives.
    ///
    /// # Errors
    ///
    /// Id allocation or transport errors.
    async fn create_document(&self, id: Option<&str>, body: String) -> Result<String>;

    /// Delete document `id` at revision `rev`.
    ///
    /// # Errors
    ///
    /// Transport errors, including `409` when `rev` is stale.
    async fn delete_document(&self, id: &str, rev: &str) -> Result<String>;
}

/// [`DocumentStore`] over CouchDB's `/{db}/{id}` endpoints.
#[derive(Clone)]
pub struct CouchDocuments {
    transport: Arc<dyn Transport>,
    ids: Arc<dyn IdProvider>,
    database: String,
}

impl CouchDocuments {
    /// Create a store writing into `database`.
    ///
    /// # Arguments
    ///
    /// * `transport` - Issues the PUT/DELETE requests.
    /// * `ids` - Allocates ids for creates that do not name one.
    /// * `database` - Target database name.
    pub fn new(
        transport: Arc<dyn Transport>,
        ids: Arc<dyn IdProvider>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            ids,
            database: database.into(),
        }
    }

    fn document_path(&self, id: &str) -> String {
        format!(
            "/{}/{}",
            encode_component(&self.database),
            encode_component(id)
        )
    }
}

#[async_trait::async_trait]
impl DocumentStore for CouchDocuments {
    async fn create_document(&self, id: Option<&str>, body: String) -> Result<String> {
        let id = match id {
            Some(id) => id.to_owned(),
            None => self.ids.next_id().await?,
        };
        let path = self.document_path(&id);
        self.transport.request(RequestOptions::put(path, body)).await
    }

    async fn delete_document(&self, id: &str, rev: &str) -> Result<String> {
        let path = format!("{}?rev={}", self.document_path(id), encode_component(rev));
        self.transport.request(RequestOptions::delete(path)).await
    }
}
