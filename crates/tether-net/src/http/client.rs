//! The reqwest-backed transport.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use http::header::COOKIE;
use reqwest::redirect::Policy;
use tether_core::logging::targets;

use super::cookie::CookieStore;
use super::response::RawResponse;
use super::transport::{Transport, TransportFailure, TransportRequest, TransportResult};
use crate::error::{NetworkError, Result};

/// Configuration for the shared HTTP client.
///
/// Per-attempt timeouts come from each request's
/// [`RetryPolicy`](super::transport::RetryPolicy), not from here.
#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    /// Connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Whether to follow redirects.
    pub follow_redirects: bool,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
    /// Default user agent.
    pub user_agent: Option<String>,
    /// Proxy URL.
    pub proxy: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            follow_redirects: true,
            max_redirects: 10,
            user_agent: Some(format!("Tether/{} (Rust)", env!("CARGO_PKG_VERSION"))),
            proxy: None,
        }
    }
}

/// Builder for the process-wide HTTP client.
///
/// Build it once at startup and share the resulting transport between
/// dispatchers.
///
/// ```no_run
/// use std::sync::Arc;
/// use tether_net::http::{HttpClientBuilder, MemoryCookieStore};
///
/// let cookies = Arc::new(MemoryCookieStore::new());
/// let transport = HttpClientBuilder::new()
///     .user_agent("my-app/1.0")
///     .build()?
///     .with_cookie_store(cookies);
/// # Ok::<(), tether_net::NetworkError>(())
/// ```
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    config: HttpClientConfig,
    default_headers: http::HeaderMap,
}

impl HttpClientBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an explicit configuration.
    pub fn with_config(config: HttpClientConfig) -> Self {
        Self {
            config,
            default_headers: http::HeaderMap::new(),
        }
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Disable redirect following.
    pub fn no_redirects(mut self) -> Self {
        self.config.follow_redirects = false;
        self
    }

    /// Set the maximum number of redirects to follow.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Set a proxy URL.
    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy_url.into());
        self
    }

    /// Add a default header that will be sent with every request.
    pub fn default_header(
        mut self,
        name: impl TryInto<http::HeaderName>,
        value: impl TryInto<http::HeaderValue>,
    ) -> Result<Self> {
        let name = name
            .try_into()
            .map_err(|_| NetworkError::InvalidHeader("Invalid header name".to_string()))?;
        let value = value
            .try_into()
            .map_err(|_| NetworkError::InvalidHeader("Invalid header value".to_string()))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Build the underlying `reqwest::Client`.
    pub fn build_client(self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();

        if let Some(connect_timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        if self.config.follow_redirects {
            builder = builder.redirect(Policy::limited(self.config.max_redirects));
        } else {
            builder = builder.redirect(Policy::none());
        }

        if let Some(ref ua) = self.config.user_agent {
            builder = builder.user_agent(ua);
        }

        if let Some(ref proxy_url) = self.config.proxy {
            let proxy =
                reqwest::Proxy::all(proxy_url).map_err(|e| NetworkError::Proxy(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        if !self.default_headers.is_empty() {
            builder = builder.default_headers(self.default_headers);
        }

        builder
            .build()
            .map_err(|e| NetworkError::Request(e.to_string()))
    }

    /// Build a [`ReqwestTransport`] around a new client.
    pub fn build(self) -> Result<ReqwestTransport> {
        Ok(ReqwestTransport::new(self.build_client()?))
    }
}

/// A [`Transport`] backed by a shared `reqwest::Client`.
///
/// Timed-out attempts are retried per the request's retry policy; other
/// errors fail immediately. Statuses other than 2xx and 304 are failures that
/// carry the server's response.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    cookies: Option<Arc<dyn CookieStore>>,
}

impl ReqwestTransport {
    /// Wrap an existing client.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            cookies: None,
        }
    }

    /// Attach cookies from `store` to outgoing requests.
    pub fn with_cookie_store(mut self, store: Arc<dyn CookieStore>) -> Self {
        self.cookies = Some(store);
        self
    }

    /// The underlying client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    async fn execute(
        client: reqwest::Client,
        cookies: Option<Arc<dyn CookieStore>>,
        mut request: TransportRequest,
    ) -> TransportResult {
        if let Some(store) = &cookies
            && !request.headers.contains_key(COOKIE)
            && let Some(cookie) = store.cookie_header(&request.url)
        {
            match http::HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    request.headers.insert(COOKIE, value);
                }
                Err(_) => tracing::warn!(target: targets::TRANSPORT, "dropping invalid Cookie header"),
            }
        }

        let started = Instant::now();
        let attempts = request.retry.max_retries + 1;

        for (attempt, timeout) in request.retry.attempt_timeouts().enumerate() {
            let mut builder = client
                .request(request.method.to_reqwest(), &request.url)
                .headers(request.headers.clone())
                .timeout(timeout);
            if let Some(body) = &request.body {
                builder = builder.body(body.clone());
            }

            tracing::debug!(
                target: targets::TRANSPORT,
                method = %request.method,
                url = %request.url,
                attempt = attempt + 1,
                attempts,
                timeout_ms = timeout.as_millis() as u64,
                "sending request"
            );

            match Self::attempt(builder).await {
                Ok(mut raw) => {
                    raw.elapsed = started.elapsed();
                    return classify(raw);
                }
                Err(NetworkError::Timeout) => {
                    tracing::debug!(
                        target: targets::TRANSPORT,
                        url = %request.url,
                        attempt = attempt + 1,
                        "attempt timed out"
                    );
                }
                Err(err) => return Err(TransportFailure::without_response(err)),
            }
        }

        Err(TransportFailure::without_response(NetworkError::Timeout))
    }

    async fn attempt(builder: reqwest::RequestBuilder) -> Result<RawResponse> {
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let mut raw = RawResponse::new(status, body);
        raw.headers = headers;
        Ok(raw)
    }
}

fn classify(raw: RawResponse) -> TransportResult {
    if (200..300).contains(&raw.status) || raw.not_modified {
        Ok(raw)
    } else {
        let status = raw.status;
        Err(TransportFailure::with_response(
            raw,
            NetworkError::HttpStatus { status },
        ))
    }
}

impl Transport for ReqwestTransport {
    fn submit(&self, request: TransportRequest) -> BoxFuture<'static, TransportResult> {
        Self::execute(self.client.clone(), self.cookies.clone(), request).boxed()
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("cookies", &self.cookies.is_some())
            .finish_non_exhaustive()
    }
}
