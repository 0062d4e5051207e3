//! Error types for the networking module.

use std::fmt;

/// Transport-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// HTTP request failed.
    Request(String),
    /// Invalid URL provided.
    InvalidUrl(String),
    /// Request timed out (after exhausting retries).
    Timeout,
    /// Connection refused or failed.
    Connection(String),
    /// Invalid header name or value.
    InvalidHeader(String),
    /// I/O error while reading the response.
    Io(String),
    /// Request was cancelled.
    Cancelled,
    /// HTTP error status (anything other than 2xx or 304).
    HttpStatus {
        /// The HTTP status code.
        status: u16,
    },
    /// Redirect limit exceeded.
    TooManyRedirects,
    /// Proxy configuration error.
    Proxy(String),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(msg) => write!(f, "HTTP request error: {msg}"),
            Self::InvalidUrl(msg) => write!(f, "Invalid URL: {msg}"),
            Self::Timeout => write!(f, "Request timed out"),
            Self::Connection(msg) => write!(f, "Connection error: {msg}"),
            Self::InvalidHeader(msg) => write!(f, "Invalid header: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Cancelled => write!(f, "Request was cancelled"),
            Self::HttpStatus { status } => write!(f, "HTTP {status}"),
            Self::TooManyRedirects => write!(f, "Too many redirects"),
            Self::Proxy(msg) => write!(f, "Proxy error: {msg}"),
        }
    }
}

impl std::error::Error for NetworkError {}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_redirect() {
            Self::TooManyRedirects
        } else if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Failures raised while post-processing a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The gzip stream was corrupt or truncated.
    Decompression(String),
    /// The response named a charset that cannot be decoded.
    Encoding(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decompression(msg) => write!(f, "Failed to decompress response body: {msg}"),
            Self::Encoding(label) => write!(f, "Unsupported response charset: {label}"),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Why a processed response is a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseFailure {
    /// The transport failed or the server answered with an error status.
    Transport(NetworkError),
    /// The body could not be post-processed.
    Pipeline(PipelineError),
}

impl ResponseFailure {
    /// Whether this failure belongs to the body-parse category.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::Pipeline(_))
    }
}

impl fmt::Display for ResponseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "{err}"),
            Self::Pipeline(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ResponseFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Pipeline(err) => Some(err),
        }
    }
}

/// Errors a method channel callback can report.
///
/// `MalformedJson`, `SchemaMismatch` and `Io` form the parse category: the
/// dispatcher swallows them and fires the JSON-error hook. `Other` is not
/// handled by the dispatcher and propagates to the caller.
#[derive(Debug)]
pub enum CallbackError {
    /// The body is not well-formed JSON.
    MalformedJson(String),
    /// The JSON does not match the expected shape.
    SchemaMismatch(String),
    /// An I/O error occurred while parsing the body.
    Io(std::io::Error),
    /// Any other failure.
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl CallbackError {
    /// Whether this error belongs to the parse category.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedJson(_) | Self::SchemaMismatch(_) | Self::Io(_)
        )
    }

    /// Wrap an arbitrary error as [`CallbackError::Other`].
    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Other(err.into())
    }
}

impl fmt::Display for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedJson(msg) => write!(f, "Malformed JSON: {msg}"),
            Self::SchemaMismatch(msg) => write!(f, "JSON schema mismatch: {msg}"),
            Self::Io(err) => write!(f, "I/O error while parsing: {err}"),
            Self::Other(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CallbackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CallbackError {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;
        match err.classify() {
            Category::Syntax | Category::Eof => Self::MalformedJson(err.to_string()),
            Category::Data => Self::SchemaMismatch(err.to_string()),
            Category::Io => Self::Io(err.into()),
        }
    }
}

impl From<std::io::Error> for CallbackError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Errors raised while building a request descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// The method does not fit the constructor form that was used.
    InvalidArgument(String),
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
        }
    }
}

impl std::error::Error for DescriptorError {}

/// Errors raised by the dispatcher itself.
#[derive(Debug)]
pub enum DispatchError {
    /// The dispatcher was cleared and no longer has an owner.
    Disposed,
    /// A required builder component was not supplied.
    MissingComponent(&'static str),
    /// No tokio runtime was supplied and none is running.
    NoRuntime,
    /// The UI queue is closed; results can no longer be delivered.
    QueueClosed,
    /// A method channel failed with an error outside the parse category.
    Callback(CallbackError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disposed => write!(f, "Dispatcher has been cleared"),
            Self::MissingComponent(name) => write!(f, "Dispatcher is missing its {name}"),
            Self::NoRuntime => write!(f, "No tokio runtime available"),
            Self::QueueClosed => write!(f, "UI queue is closed"),
            Self::Callback(err) => write!(f, "Callback failed: {err}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Callback(err) => Some(err),
            _ => None,
        }
    }
}

impl From<tether_core::CoreError> for DispatchError {
    fn from(err: tether_core::CoreError) -> Self {
        match err {
            tether_core::CoreError::QueueClosed => Self::QueueClosed,
        }
    }
}

/// A specialized Result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;
