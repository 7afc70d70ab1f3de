//! Connection settings for the CouchDB server and builder.

use std::fmt;
use std::time::Duration;

/// Default CouchDB host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default CouchDB port.
pub const DEFAULT_PORT: u16 = 5984;

/// HTTP Basic credentials.
///
/// The password is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Create credentials from a user name and password.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Process-wide connection configuration.
///
/// Read-only once built. Construct with [`CouchConfig::builder`].
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Host name of the CouchDB server.
    pub host: String,
    /// TCP port of the CouchDB server.
    pub port: u16,
    /// Database holding the event documents.
    pub database: String,
    /// Design document carrying the `aggregate` and `name` views.
    pub design: String,
    /// Optional Basic auth credentials.
    pub credentials: Option<Credentials>,
    /// Headers attached to every request.
    pub headers: Vec<(String, String)>,
    /// Optional deadline for a full request/response exchange.
    /// `None` means wait indefinitely.
    pub request_timeout: Option<Duration>,
}

impl CouchConfig {
    /// Start building a configuration for the given database.
    ///
    /// # Examples
    ///
    /// ```
    /// use couch_es::CouchConfig;
    ///
    /// let config = CouchConfig::builder("cqrs").port(5985).build();
    /// assert_eq!(config.host, "localhost");
    /// assert_eq!(config.design, "cqrs");
    /// assert_eq!(config.base_url(), "http://localhost:5985");
    /// ```
    pub fn builder(database: impl Into<String>) -> CouchConfigBuilder {
        CouchConfigBuilder::new(database)
    }

    /// Returns `http://{host}:{port}`.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Builder for [`CouchConfig`].
///
/// Every setting except the database name has a default: host
/// [`DEFAULT_HOST`], port [`DEFAULT_PORT`], design document equal to the
/// database name, no credentials, no extra headers, and no timeout.
#[derive(Debug, Clone)]
pub struct CouchConfigBuilder {
    host: String,
    port: u16,
    database: String,
    design: Option<String>,
    user: Option<String>,
    password: Option<String>,
    headers: Vec<(String, String)>,
    request_timeout: Option<Duration>,
}

impl CouchConfigBuilder {
    /// Create a builder with defaults for the given database.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            database: database.into(),
            design: None,
            user: None,
            password: None,
            headers: Vec::new(),
            request_timeout: None,
        }
    }

    /// Set the server host name.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the design document name. Defaults to the database name.
    pub fn design(mut self, design: impl Into<String>) -> Self {
        self.design = Some(design.into());
        self
    }

    /// Set the Basic auth user name.
    ///
    /// Credentials are only used when both user and password are set.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the Basic auth password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Add a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a deadline for each request/response exchange.
    ///
    /// Without one, a server that never answers leaves the call pending.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Finish building.
    pub fn build(self) -> CouchConfig {
        let credentials = match (self.user, self.password) {
            (Some(user), Some(password)) => Some(Credentials { user, password }),
            _ => None,
        };
        let design = self.design.unwrap_or_else(|| self.database.clone());
        CouchConfig {
            host: self.host,
            port: self.port,
            database: self.database,
            design,
            credentials,
            headers: self.headers,
            request_timeout: self.request_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_local_couchdb() {
        let config = CouchConfig::builder("cqrs").build();
        assert_eq!(config.database, "cqrs");
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5984);
        assert_eq!(config.design, "cqrs");
        assert!(config.credentials.is_none());
        assert!(config.request_timeout.is_none());
        assert_eq!(config.base_url(), "http://localhost:5984");
    }

    #[test]
    fn credentials_require_user_and_password() {
        let only_user = CouchConfig::builder("cqrs").user("foo").build();
        assert!(only_user.credentials.is_none());

        let only_password = CouchConfig::builder("cqrs").password("bar").build();
        assert!(only_password.credentials.is_none());

        let both = CouchConfig::builder("cqrs").user("foo").password("bar").build();
        assert_eq!(both.credentials, Some(Credentials::new("foo", "bar")));
    }

    #[test]
    fn explicit_settings_override_defaults() {
        let config = CouchConfig::builder("events")
            .host("couch.internal")
            .port(6984)
            .design("es")
            .header("X-Trace", "1")
            .request_timeout(Duration::from_secs(3))
            .build();
        assert_eq!(config.base_url(), "http://couch.internal:6984");
        assert_eq!(config.design, "es");
        assert_eq!(config.headers, vec![("X-Trace".to_string(), "1".to_string())]);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let debug = format!("{:?}", Credentials::new("foo", "secret"));
        assert!(debug.contains("foo"));
        assert!(!debug.contains("secret"));
    }
}
