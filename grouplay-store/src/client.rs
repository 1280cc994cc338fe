use std::time::Duration;

#[derive(Debug)]
/// An error that can occur when interacting with the store.
pub enum StoreError {
    /// The client is not bound to a session, so there is nothing to read or write.
    NotBound,
    /// An error that occurred when making a request.
    ReqwestError(reqwest::Error),
    /// An error that occurred when serializing or deserializing a payload.
    SerializationError(serde_json::Error),
    /// The store returned a node that does not have the expected shape.
    UnexpectedShape {
        /// The path of the offending node, relative to the session.
        path: String,
    },
    /// A key or session ID contains characters the store cannot hold in a path segment.
    InvalidKey {
        /// The rejected key.
        key: String,
    },
    /// The configured base URL cannot have paths appended to it.
    InvalidBaseUrl {
        /// The rejected URL.
        base_url: String,
        /// Why the URL was rejected.
        message: String,
    },
    /// The server returned an error.
    ServerError {
        /// The HTTP status code.
        status: u16,
        /// The error message, if the server supplied one.
        message: Option<String>,
    },
}
impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotBound => write!(f, "Not bound to a session"),
            StoreError::ReqwestError(e) => write!(f, "Reqwest error: {e}"),
            StoreError::SerializationError(e) => write!(f, "Serialization error: {e}"),
            StoreError::UnexpectedShape { path } => {
                write!(f, "Unexpected shape for node `{path}`")
            }
            StoreError::InvalidKey { key } => write!(f, "Invalid store key `{key}`"),
            StoreError::InvalidBaseUrl { base_url, message } => {
                write!(f, "Invalid base URL `{base_url}`: {message}")
            }
            StoreError::ServerError { status, message } => {
                write!(f, "Store error: {status}")?;
                if let Some(message) = message {
                    write!(f, ": {message}")?;
                }
                Ok(())
            }
        }
    }
}
impl std::error::Error for StoreError {}
impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::ReqwestError(e)
    }
}
impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::SerializationError(e)
    }
}
/// A result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A client for a Firebase-style REST store.
#[derive(Clone)]
pub struct Client {
    pub(crate) base_url: String,
    pub(crate) session_id: Option<String>,
    pub(crate) auth_token: Option<String>,
    pub(crate) poll_interval: Duration,
    pub(crate) client: reqwest::Client,
}
impl Client {
    /// The node under which all sessions live.
    pub const SESSIONS_ROOT: &str = "sessions";
    /// How often child subscriptions poll the store by default.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

    /// Create a new client that is not yet bound to a session.
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            session_id: None,
            auth_token: auth_token.filter(|t| !t.is_empty()),
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            client: reqwest::Client::new(),
        }
    }

    /// Bind the client to a session. An empty id leaves the client unbound.
    pub fn bind(mut self, session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        self.session_id = (!session_id.is_empty()).then_some(session_id);
        self
    }

    /// Set the interval at which child subscriptions poll the store.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// The session this client is bound to, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// The interval at which child subscriptions poll the store.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}
