//! Recording test doubles for the transport and id seams.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::{RequestOptions, Transport};
use crate::uuids::IdProvider;

/// Body returned for paths with no scripted reply: a valid, empty view
/// response that also reads as a successful write.
pub(crate) const DEFAULT_BODY: &str = r#"{"ok":true,"rows":[]}"#;

/// Scripted outcome for one path.
#[derive(Debug, Clone)]
pub(crate) struct Reply {
    status: u16,
    body: String,
    delay: Duration,
}

impl Reply {
    /// A 200 with `body`.
    pub(crate) fn body(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    /// A failing response with `status`.
    pub(crate) fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    /// Hold the response back for `delay` before completing.
    pub(crate) fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// [`Transport`] that records every request and answers from a script
/// keyed by exact path.
#[derive(Default)]
pub(crate) struct MockTransport {
    replies: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<RequestOptions>>,
    completed: Mutex<Vec<String>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Script the reply for `path`.
    pub(crate) fn on(&self, path: impl Into<String>, reply: Reply) {
        self.replies.lock().unwrap().insert(path.into(), reply);
    }

    /// Requests in the order they were issued.
    pub(crate) fn requests(&self) -> Vec<RequestOptions> {
        self.requests.lock().unwrap().clone()
    }

    /// Paths in the order their responses completed.
    pub(crate) fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn request(&self, options: RequestOptions) -> Result<String> {
        self.requests.lock().unwrap().push(options.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(&options.path)
            .cloned()
            .unwrap_or_else(|| Reply::body(DEFAULT_BODY));

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        self.completed.lock().unwrap().push(options.path);

        if (200..300).contains(&reply.status) {
            Ok(reply.body)
        } else {
            Err(Error::Status {
                status: reply.status,
                body: reply.body,
            })
        }
    }
}

/// [`IdProvider`] that always hands out the same id and counts calls.
pub(crate) struct FixedIds {
    id: String,
    calls: AtomicUsize,
}

impl FixedIds {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IdProvider for FixedIds {
    async fn next_id(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.id.clone())
    }
}
