//! The transport seam the dispatcher submits requests through.
//!
//! The dispatcher depends only on [`Transport`]; [`ReqwestTransport`] is the
//! bundled adapter. Cancellation is expressed by dropping the returned future.
//!
//! [`ReqwestTransport`]: super::client::ReqwestTransport

use std::time::Duration;

use futures_util::future::BoxFuture;
use http::HeaderMap;

use super::request::{HttpMethod, RequestDescriptor};
use super::response::RawResponse;
use crate::error::NetworkError;

/// Retry behavior requested from the transport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Attempts made after the first one.
    pub max_retries: u32,
    /// Timeout of the first attempt.
    pub initial_timeout: Duration,
    /// After a timed-out attempt the timeout grows by `timeout * multiplier`.
    pub backoff_multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_timeout: Duration::from_millis(5000),
            backoff_multiplier: 1.0,
        }
    }
}

impl RetryPolicy {
    /// The timeout to use for the attempt following one that used `current`.
    pub fn next_timeout(&self, current: Duration) -> Duration {
        let grow = current.as_nanos() as f64 * f64::from(self.backoff_multiplier.max(0.0));
        current + Duration::from_nanos(grow.round() as u64)
    }

    /// Timeouts for every attempt, first one included.
    pub fn attempt_timeouts(&self) -> impl Iterator<Item = Duration> + '_ {
        let mut timeout = self.initial_timeout;
        (0..=self.max_retries).map(move |attempt| {
            if attempt > 0 {
                timeout = self.next_timeout(timeout);
            }
            timeout
        })
    }
}

/// One call handed to a [`Transport`].
#[derive(Clone, Debug)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The full URL, query included.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// The literal payload for POST/PUT.
    pub body: Option<String>,
    /// Retry behavior for this call.
    pub retry: RetryPolicy,
}

impl TransportRequest {
    /// Build a transport request from a descriptor.
    ///
    /// Header entries that are not valid HTTP are dropped with a warning.
    pub fn from_descriptor(descriptor: &RequestDescriptor, retry: RetryPolicy) -> Self {
        let mut headers = HeaderMap::with_capacity(descriptor.header_map().len());
        for (name, value) in descriptor.header_map() {
            match (
                http::HeaderName::from_bytes(name.as_bytes()),
                http::HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(
                    target: tether_core::logging::targets::TRANSPORT,
                    header = %name,
                    "dropping invalid request header"
                ),
            }
        }

        Self {
            method: descriptor.method(),
            url: descriptor.url().to_string(),
            headers,
            body: descriptor.body().map(str::to_string),
            retry,
        }
    }
}

/// A failed transport call.
#[derive(Clone, Debug)]
pub struct TransportFailure {
    /// What the server sent, if it answered (e.g. a 4xx or 5xx).
    pub response: Option<RawResponse>,
    /// The failure cause.
    pub error: NetworkError,
}

impl TransportFailure {
    /// A failure where the server never answered.
    pub fn without_response(error: NetworkError) -> Self {
        Self {
            response: None,
            error,
        }
    }

    /// A failure carrying the server's error response.
    pub fn with_response(response: RawResponse, error: NetworkError) -> Self {
        Self {
            response: Some(response),
            error,
        }
    }
}

/// The outcome of one transport call.
pub type TransportResult = std::result::Result<RawResponse, TransportFailure>;

/// Performs HTTP calls in the background.
///
/// The returned future must be `'static` so the dispatcher can race it
/// against cancellation on its runtime. Dropping the future cancels the call.
pub trait Transport: Send + Sync {
    /// Submit a request.
    fn submit(&self, request: TransportRequest) -> BoxFuture<'static, TransportResult>;
}
