//! HTTP response types.

use std::time::Duration;

use bytes::Bytes;
use http::HeaderMap;

use crate::error::ResponseFailure;

/// A response as produced by the transport, before post-processing.
#[derive(Clone, Debug, Default)]
pub struct RawResponse {
    /// The HTTP status code.
    pub status: u16,
    /// Response headers. May hold several values per name (e.g. `Set-Cookie`).
    pub headers: HeaderMap,
    /// The body bytes exactly as received.
    pub body: Bytes,
    /// Whether the server answered a conditional request with 304.
    pub not_modified: bool,
    /// Time the transport spent on the call.
    pub elapsed: Duration,
}

impl RawResponse {
    /// Create a response with the given status and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
            not_modified: status == 304,
            ..Default::default()
        }
    }

    /// Add a header value, keeping any existing values for the same name.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::HeaderName::from_bytes(name.as_ref().as_bytes()),
            http::HeaderValue::from_str(value.as_ref()),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Set the elapsed-time hint.
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }
}

/// A processed response, as delivered to application code.
#[derive(Clone, Debug, Default)]
pub struct ApiResponse {
    status: Option<u16>,
    headers: HeaderMap,
    text: Option<String>,
    not_modified: bool,
    elapsed: Duration,
    failure: Option<ResponseFailure>,
}

impl ApiResponse {
    pub(crate) fn new(
        status: Option<u16>,
        headers: HeaderMap,
        text: Option<String>,
        not_modified: bool,
        elapsed: Duration,
        failure: Option<ResponseFailure>,
    ) -> Self {
        Self {
            status,
            headers,
            text,
            not_modified,
            elapsed,
            failure,
        }
    }

    /// The HTTP status code, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// The response headers (merged with cached ones on a 304).
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Whether the server answered 304 Not Modified.
    pub fn is_not_modified(&self) -> bool {
        self.not_modified
    }

    /// Time the transport spent on the call.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Whether the call succeeded end to end.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Why the call failed, if it did.
    pub fn failure(&self) -> Option<&ResponseFailure> {
        self.failure.as_ref()
    }

    /// The decoded body handed to method channels: absent on any failure.
    pub fn body(&self) -> Option<&str> {
        if self.failure.is_some() {
            None
        } else {
            self.text.as_deref()
        }
    }

    /// The decoded text the server sent, including error payloads.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}
