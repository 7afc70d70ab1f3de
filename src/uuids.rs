//! Document id allocation.
//!
//! [`ServerIds`] asks CouchDB's `/_uuids` endpoint; [`LocalIds`] generates
//! ids in-process in the same 32-hex-digit form.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::transport::{RequestOptions, Transport};

/// Path of CouchDB's id allocation endpoint.
pub const UUIDS_PATH: &str = "/_uuids";

/// Source of fresh, globally unique document ids.
#[async_trait::async_trait]
pub trait IdProvider: Send + Sync {
    /// Allocate one id.
    ///
    /// # Errors
    ///
    /// Implementation-specific; see [`ServerIds::next_id`].
    async fn next_id(&self) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct UuidEnvelope {
    uuids: Vec<String>,
}

fn decode_uuids(raw: &str) -> Result<Vec<String>> {
    let envelope: UuidEnvelope =
        serde_json::from_str(raw).map_err(|e| Error::decode("uuid envelope", e))?;
    Ok(envelope.uuids)
}

/// Allocates ids from the server's `/_uuids` endpoint.
#[derive(Clone)]
pub struct ServerIds {
    transport: Arc<dyn Transport>,
}

impl ServerIds {
    /// Create an allocator that issues requests through `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Allocate `count` ids in one round-trip.
    ///
    /// # Errors
    ///
    /// * Any transport error.
    /// * [`Error::Decode`] if the body is not a `{"uuids": [...]}` envelope.
    pub async fn next_ids(&self, count: usize) -> Result<Vec<String>> {
        let path = format!("{UUIDS_PATH}?count={count}");
        let body = self.transport.request(RequestOptions::get(path)).await?;
        decode_uuids(&body)
    }
}

#[async_trait::async_trait]
impl IdProvider for ServerIds {
    /// `GET /_uuids` and return the first id of the envelope.
    ///
    /// # Errors
    ///
    /// * Any transport error.
    /// * [`Error::Decode`] if the body is not a `{"uuids": [...]}` envelope.
    /// * [`Error::EmptyUuids`] if the envelope holds no ids.
    async fn next_id(&self) -> Result<String> {
        let body = self.transport.request(RequestOptions::get(UUIDS_PATH)).await?;
        let id = decode_uuids(&body)?
            .into_iter()
            .next()
            .ok_or(Error::EmptyUuids)?;
        tracing::debug!(%id, "allocated document id");
        Ok(id)
    }
}

/// Generates random (v4) ids locally, without a round-trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalIds;

#[async_trait::async_trait]
impl IdProvider for LocalIds {
    async fn next_id(&self) -> Result<String> {
        Ok(Uuid::new_v4().simple().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTransport, Reply};

    #[tokio::test]
    async fn next_id_requests_uuid_endpoint() {
        let transport = Arc::new(MockTransport::new());
        transport.on(
            UUIDS_PATH,
            Reply::body(r#"{"uuids":["a45287db79779654689b4df73a00087a"]}"#),
        );
        let ids = ServerIds::new(transport.clone());

        let id = ids.next_id().await.expect("id should be allocated");

        assert_eq!(id, "a45287db79779654689b4df73a00087a");
        assert_eq!(transport.requests(), vec![RequestOptions::get("/_uuids")]);
    }

    #[tokio::test]
    async fn next_ids_passes_count() {
        let transport = Arc::new(MockTransport::new());
        transport.on("/_uuids?count=2", Reply::body(r#"{"uuids":["a","b"]}"#));
        let ids = ServerIds::new(transport.clone());

        let got = ids.next_ids(2).await.expect("ids should be allocated");

        assert_eq!(got, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn malformed_envelope_is_decode_error() {
        let transport = Arc::new(MockTransport::new());
        transport.on(UUIDS_PATH, Reply::body("<html>"));
        let err = ServerIds::new(transport)
            .next_id()
            .await
            .expect_err("garbage body should fail");
        assert!(matches!(err, Error::Decode { context: "uuid envelope", .. }));
    }

    #[tokio::test]
    async fn empty_envelope_is_reported() {
        let transport = Arc::new(MockTransport::new());
        transport.on(UUIDS_PATH, Reply::body(r#"{"uuids":[]}"#));
        let err = ServerIds::new(transport)
            .next_id()
            .await
            .expect_err("empty list should fail");
        assert!(matches!(err, Error::EmptyUuids));
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let transport = Arc::new(MockTransport::new());
        transport.on(UUIDS_PATH, Reply::status(503, "down"));
        let err = ServerIds::new(transport)
            .next_id()
            .await
            .expect_err("server error should fail");
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn local_ids_are_unique_hex() {
        let a = LocalIds.next_id().await.expect("local id");
        let b = LocalIds.next_id().await.expect("local id");
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
