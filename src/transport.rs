//! Single-request HTTP transport to the CouchDB server.
//!
//! [`Transport`] is the seam every higher layer talks through: one call,
//! one request, one fully buffered response body. [`HttpTransport`] is the
//! `reqwest`-backed implementation; tests substitute a recording mock.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tokio_stream::{Stream, StreamExt};

use crate::config::{CouchConfig, Credentials};
use crate::error::{Error, Result};

/// HTTP method of a [`RequestOptions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET` (the default).
    #[default]
    Get,
    /// `PUT`.
    Put,
    /// `POST`.
    Post,
    /// `DELETE`.
    Delete,
}

impl Method {
    /// Upper-case method name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Put => reqwest::Method::PUT,
            Self::Post => reqwest::Method::POST,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for a single request.
///
/// Unset `host` and `port` fall back to the transport's configured target.
/// The default is a `GET` of `/` with no body and no extra headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    /// HTTP method.
    pub method: Method,
    /// Path and query string, starting with `/`.
    pub path: String,
    /// Request body, written verbatim.
    pub data: Option<String>,
    /// Host override.
    pub host: Option<String>,
    /// Port override.
    pub port: Option<u16>,
    /// Extra headers for this request only.
    pub headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::Get,
            path: "/".to_owned(),
            data: None,
            host: None,
            port: None,
            headers: Vec::new(),
        }
    }
}

impl RequestOptions {
    /// A `GET` of `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// A `PUT` of `data` to `path`.
    pub fn put(path: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            data: Some(data.into()),
            ..Self::default()
        }
    }

    /// A `POST` of `data` to `path`.
    pub fn post(path: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            data: Some(data.into()),
            ..Self::default()
        }
    }

    /// A `DELETE` of `path`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            ..Self::default()
        }
    }

    /// Override the target host for this request.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Override the target port for this request.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Add a header to this request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Issues one HTTP request and returns the complete response body.
///
/// Implementations must send exactly one request per call and must not
/// retry. A caller that has no use for the body simply drops it.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send the request described by `options`.
    ///
    /// # Returns
    ///
    /// The response body, with every chunk concatenated in arrival order.
    /// A response without a body yields an empty string.
    ///
    /// # Errors
    ///
    /// * [`Error::Http`] on connection-level failures.
    /// * [`Error::Status`] if the server answers with a non-success status.
    /// * [`Error::Timeout`] if a deadline is configured and elapses.
    async fn request(&self, options: RequestOptions) -> Result<String>;
}

/// Value of the `Authorization` header for HTTP Basic auth.
///
/// # Examples
///
/// ```
/// use couch_es::{Credentials, basic_auth_value};
///
/// let value = basic_auth_value(&Credentials::new("foo", "bar"));
/// assert_eq!(value, "Basic Zm9vOmJhcg==");
/// ```
pub fn basic_auth_value(credentials: &Credentials) -> String {
    let raw = format!("{}:{}", credentials.user, credentials.password);
    format!("Basic {}", STANDARD.encode(raw))
}

/// Buffer a chunked body into a single string.
///
/// Chunks are appended in the order the stream yields them and the result
/// is produced once, after the stream ends. An empty stream yields `""`.
///
/// # Errors
///
/// Returns the first chunk error, or [`Error::InvalidUtf8`] if the
/// assembled bytes are not UTF-8.
pub async fn collect_body<S, B, E>(stream: S) -> Result<String>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<Error>,
{
    let mut stream = std::pin::pin!(stream);
    let mut buffer = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Into::<Error>::into)?;
        buffer.extend_from_slice(chunk.as_ref());
    }
    Ok(String::from_utf8(buffer)?)
}

/// Percent-encode a single path segment or query value.
///
/// Spaces become `%20` so the output is safe in both positions.
pub(crate) fn encode_component(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Parse a header pair into typed `reqwest` values.
fn typed_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| Error::InvalidHeader(format!("bad header name '{name}'")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|_| Error::InvalidHeader(format!("bad value for header '{name}'")))?;
    Ok((name, value))
}

struct HttpInner {
    client: reqwest::Client,
    config: CouchConfig,
    /// Pre-computed `Authorization` value; `None` when no credentials.
    authorization: Option<String>,
}

/// `reqwest`-backed [`Transport`] targeting the configured CouchDB server.
///
/// Clone is cheap; clones share one connection pool and one configuration.
#[derive(Clone)]
pub struct HttpTransport {
    inner: Arc<HttpInner>,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.inner.config.base_url())
            .field("auth", &self.inner.authorization.is_some())
            .field("timeout", &self.inner.config.request_timeout)
            .finish()
    }
}

impl HttpTransport {
    /// Build a transport for the given configuration.
    ///
    /// No connection is opened until the first request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the underlying client cannot be built
    /// (e.g. the system TLS/DNS backend fails to initialize).
    pub fn new(config: CouchConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let authorization = config.credentials.as_ref().map(basic_auth_value);
        Ok(Self {
            inner: Arc::new(HttpInner {
                client,
                config,
                authorization,
            }),
        })
    }

    /// The configuration this transport was built from.
    pub fn config(&self) -> &CouchConfig {
        &self.inner.config
    }

    /// Absolute URL for `options`, applying host/port defaults.
    fn url_for(&self, options: &RequestOptions) -> String {
        let config = &self.inner.config;
        let host = options.host.as_deref().unwrap_or(&config.host);
        let port = options.port.unwrap_or(config.port);
        format!("http://{host}:{port}{}", options.path)
    }

    /// Headers for one request: credentials, then configured headers, then
    /// the request's own. Later entries replace earlier ones of the same
    /// name. A body without an explicit `Content-Type` is sent as JSON.
    fn merged_headers(&self, options: &RequestOptions) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(auth) = &self.inner.authorization {
            let value = HeaderValue::from_str(auth)
                .map_err(|_| Error::InvalidHeader("bad credentials".to_owned()))?;
            headers.insert(AUTHORIZATION, value);
        }
        for (name, value) in self.inner.config.headers.iter().chain(&options.headers) {
            let (name, value) = typed_header(name, value)?;
            headers.insert(name, value);
        }
        if options.data.is_some() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(headers)
    }

    async fn exchange(&self, options: RequestOptions) -> Result<String> {
        let url = self.url_for(&options);
        tracing::debug!(method = %options.method, path = %options.path, "sending request");

        let mut request = self.inner.client.request(options.method.to_reqwest(), &url);
        let headers = self.merged_headers(&options)?;
        if let Some(data) = options.data {
            request = request.body(data);
        }
        request = request.headers(headers);

        let response = request.send().await?;
        let status = response.status();
        let body = collect_body(response.bytes_stream()).await?;
        tracing::debug!(status = status.as_u16(), bytes = body.len(), "response received");

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn request(&self, options: RequestOptions) -> Result<String> {
        match self.inner.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, self.exchange(options))
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => self.exchange(options).await,
        }
    }
}
