//! Crate-level error type for transport, decoding, and query coordination.

use std::time::Duration;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by every fallible operation in this crate.
///
/// Transport failures, non-success HTTP statuses, and malformed response
/// bodies are all surfaced here so that no write or query result is ever
/// dropped silently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection refused, reset, DNS failure, or any other failure inside
    /// the HTTP client. Never retried by this crate.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured request deadline elapsed before the response body
    /// was fully received.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with a non-success status code.
    ///
    /// Authentication and authorization failures (401/403) land here as
    /// well; they are not recovered specially.
    #[error("server responded with status {status}: {body}")]
    Status {
        /// Numeric HTTP status code.
        status: u16,
        /// Response body, as returned by the server.
        body: String,
    },

    /// The response body was not valid UTF-8.
    #[error("response body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A response body could not be decoded into the expected shape.
    #[error("failed to decode {context}: {source}")]
    Decode {
        /// What was being decoded (e.g. "uuid envelope").
        context: &'static str,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// An event record could not be serialized to JSON.
    #[error("failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),

    /// The identifier allocation endpoint returned an empty list.
    #[error("uuid endpoint returned no identifiers")]
    EmptyUuids,

    /// A configured or per-request header name or value is not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// One sub-query of a multi-name fetch failed.
    ///
    /// The whole fetch fails with the error of the first failing name in
    /// input order, after every sub-query has settled.
    #[error("query for event name '{name}' failed: {source}")]
    SubQuery {
        /// Event name whose view query failed.
        name: String,
        /// The sub-query's own error.
        #[source]
        source: Box<Error>,
    },

    /// A shared [`EventStore`](crate::EventStore) was installed twice.
    #[error("shared event store is already initialized")]
    AlreadyInitialized,
}

impl Error {
    /// Build a [`Error::Decode`] with the given context.
    pub(crate) fn decode(context: &'static str, source: serde_json::Error) -> Self {
        Self::Decode { context, source }
    }

    /// Returns the HTTP status code if this error carries one.
    ///
    /// Looks through [`Error::SubQuery`] wrappers so callers of a fan-out
    /// fetch can still distinguish, say, a missing design document (404).
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::SubQuery { source, .. } => source.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_includes_code_and_body() {
        let err = Error::Status {
            status: 404,
            body: r#"{"error":"not_found"}"#.to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"server responded with status 404: {"error":"not_found"}"#
        );
    }

    #[test]
    fn decode_display_names_context() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::decode("uuid envelope", source);
        assert!(err.to_string().starts_with("failed to decode uuid envelope"));
    }

    #[test]
    fn sub_query_exposes_inner_status() {
        let err = Error::SubQuery {
            name: "user:created".to_string(),
            source: Box::new(Error::Status {
                status: 401,
                body: String::new(),
            }),
        };
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("'user:created'"));
    }

    #[test]
    fn timeout_display() {
        let err = Error::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "request timed out after 250ms");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn utf8_from_conversion() {
        let bad = String::from_utf8(vec![0xff, 0xfe]).unwrap_err();
        let err = Error::from(bad);
        assert!(matches!(err, Error::InvalidUtf8(_)));
    }

    // Errors cross task boundaries in the fan-out and in spawned callers.
    const _: () = {
        #[allow(dead_code)]
        fn assert_send_sync<T: Send + Sync>() {}

        #[allow(dead_code)]
        fn check() {
            assert_send_sync::<Error>();
        }
    };
}
