//! Response post-processing.
//!
//! Every completed transport call passes through [`ResponsePipeline::process`]
//! exactly once, in this order:
//!
//! 1. **Decompression** of `Content-Encoding: gzip` bodies (skipped on 304).
//!    A corrupt stream turns the whole response into a failure.
//! 2. **Cookie propagation** of every `Set-Cookie` header to the cookie
//!    store, on success and failure alike.
//! 3. **Conditional merge**: on a GET 304 the cached headers for the URL are
//!    merged under the fresh ones (fresh wins), and an empty body is replaced
//!    by the cached one. Validated GET 2xx responses are remembered; a 2xx
//!    from any other method drops the URL's entry.
//! 4. **Charset-aware decoding** using the `Content-Type` charset, UTF-8 by
//!    default.

use std::collections::{HashMap, VecDeque};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use flate2::read::GzDecoder;
use http::HeaderMap;
use http::header::{CONTENT_ENCODING, CONTENT_TYPE, ETAG, LAST_MODIFIED, SET_COOKIE};
use parking_lot::Mutex;
use tether_core::logging::targets;

use super::cookie::CookieStore;
use super::request::HttpMethod;
use super::response::{ApiResponse, RawResponse};
use super::transport::{TransportFailure, TransportResult};
use crate::error::{PipelineError, ResponseFailure};

/// Default number of entries kept by the [`ConditionalCache`].
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Configuration for the response pipeline.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Fail with [`PipelineError::Encoding`] on an unknown charset label
    /// instead of falling back to UTF-8.
    pub strict_charset: bool,
    /// Maximum number of URLs remembered for 304 revalidation.
    pub cache_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strict_charset: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Headers and body of the last validated GET response per URL.
///
/// Only responses carrying an `ETag` or `Last-Modified` validator are kept.
/// Once full, the least recently stored URL is evicted.
#[derive(Debug)]
pub struct ConditionalCache {
    capacity: usize,
    entries: Mutex<CacheEntries>,
}

#[derive(Debug, Default)]
struct CacheEntries {
    by_url: HashMap<String, CachedEntry>,
    order: VecDeque<String>,
}

#[derive(Clone, Debug)]
struct CachedEntry {
    headers: HeaderMap,
    body: Bytes,
}

impl CacheEntries {
    fn forget(&mut self, url: &str) -> bool {
        if self.by_url.remove(url).is_none() {
            return false;
        }
        self.order.retain(|key| key != url);
        true
    }
}

impl ConditionalCache {
    /// Create an empty cache with [`DEFAULT_CACHE_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create an empty cache holding at most `capacity` URLs.
    ///
    /// A capacity of zero disables caching.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(CacheEntries::default()),
        }
    }

    /// Remember a fresh response for `url`.
    ///
    /// Returns `false` without storing anything when the headers carry no
    /// validator.
    pub fn remember(&self, url: &str, headers: &HeaderMap, body: &Bytes) -> bool {
        if self.capacity == 0 || !has_validator(headers) {
            return false;
        }

        let mut entries = self.entries.lock();
        entries.forget(url);
        while entries.order.len() >= self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.by_url.remove(&oldest);
            tracing::trace!(target: targets::PIPELINE, url = %oldest, "evicted cached response");
        }

        entries.order.push_back(url.to_string());
        entries.by_url.insert(
            url.to_string(),
            CachedEntry {
                headers: headers.clone(),
                body: body.clone(),
            },
        );
        true
    }

    /// Merge a 304 response with the cached entry for `url`.
    ///
    /// Fresh header values replace cached values of the same name. Without a
    /// cached entry the fresh response is returned untouched.
    pub fn merge(&self, url: &str, fresh: HeaderMap, body: Bytes) -> (HeaderMap, Bytes) {
        let mut entries = self.entries.lock();
        let Some(cached) = entries.by_url.get_mut(url) else {
            return (fresh, body);
        };

        let mut merged = cached.headers.clone();
        for name in fresh.keys() {
            merged.remove(name);
        }
        for (name, value) in fresh.iter() {
            merged.append(name.clone(), value.clone());
        }

        let body = if body.is_empty() {
            cached.body.clone()
        } else {
            body
        };

        cached.headers = merged.clone();
        tracing::debug!(target: targets::PIPELINE, url, "merged 304 with cached headers");
        (merged, body)
    }

    /// Drop the entry for `url`. Returns whether one existed.
    pub fn invalidate(&self, url: &str) -> bool {
        self.entries.lock().forget(url)
    }

    /// Whether an entry exists for `url`.
    pub fn contains(&self, url: &str) -> bool {
        self.entries.lock().by_url.contains_key(url)
    }

    /// Number of cached URLs.
    pub fn len(&self) -> usize {
        self.entries.lock().by_url.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of cached URLs.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.by_url.clear();
        entries.order.clear();
    }
}

impl Default for ConditionalCache {
    fn default() -> Self {
        Self::new()
    }
}

fn has_validator(headers: &HeaderMap) -> bool {
    headers.contains_key(ETAG) || headers.contains_key(LAST_MODIFIED)
}

/// Post-processes raw transport results into [`ApiResponse`]s.
pub struct ResponsePipeline {
    config: PipelineConfig,
    cookies: Option<Arc<dyn CookieStore>>,
    cache: ConditionalCache,
}

impl ResponsePipeline {
    /// Create a pipeline without a cookie store.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            cookies: None,
            cache: ConditionalCache::with_capacity(config.cache_capacity),
            config,
        }
    }

    /// Forward `Set-Cookie` headers to `store`.
    pub fn with_cookie_store(mut self, store: Arc<dyn CookieStore>) -> Self {
        self.cookies = Some(store);
        self
    }

    /// The conditional-response cache.
    pub fn cache(&self) -> &ConditionalCache {
        &self.cache
    }

    /// Process one transport result for a `method` request to `url`.
    pub fn process(&self, method: HttpMethod, url: &str, result: TransportResult) -> ApiResponse {
        match result {
            Ok(raw) => self.process_success(method, url, raw),
            Err(failure) => self.process_failure(url, failure),
        }
    }

    fn process_success(&self, method: HttpMethod, url: &str, raw: RawResponse) -> ApiResponse {
        let RawResponse {
            status,
            headers,
            body,
            not_modified,
            elapsed,
        } = raw;

        let body = match decompress(&headers, body, not_modified) {
            Ok(body) => body,
            Err(err) => {
                self.propagate_cookies(url, &headers);
                return pipeline_failure(status, headers, not_modified, elapsed, err);
            }
        };

        self.propagate_cookies(url, &headers);

        let fresh = (200..300).contains(&status);
        let (headers, body) = match method {
            HttpMethod::Get if not_modified => self.cache.merge(url, headers, body),
            HttpMethod::Get => {
                if fresh {
                    self.cache.remember(url, &headers, &body);
                }
                (headers, body)
            }
            _ => {
                if fresh && self.cache.invalidate(url) {
                    tracing::debug!(target: targets::PIPELINE, %method, url, "dropped cached response");
                }
                (headers, body)
            }
        };

        match decode(&headers, &body, self.config.strict_charset) {
            Ok(text) => ApiResponse::new(
                Some(status),
                headers,
                Some(text),
                not_modified,
                elapsed,
                None,
            ),
            Err(err) => pipeline_failure(status, headers, not_modified, elapsed, err),
        }
    }

    fn process_failure(&self, url: &str, failure: TransportFailure) -> ApiResponse {
        let TransportFailure { response, error } = failure;
        let Some(raw) = response else {
            return ApiResponse::new(
                None,
                HeaderMap::new(),
                None,
                false,
                Duration::ZERO,
                Some(ResponseFailure::Transport(error)),
            );
        };

        self.propagate_cookies(url, &raw.headers);

        // Error payloads are informational; a bad stream or charset only
        // loses the text, the failure cause stays the transport error.
        let text = decompress(&raw.headers, raw.body, raw.not_modified)
            .ok()
            .map(|body| match decode(&raw.headers, &body, false) {
                Ok(text) => text,
                Err(_) => String::from_utf8_lossy(&body).into_owned(),
            });

        ApiResponse::new(
            Some(raw.status),
            raw.headers,
            text,
            raw.not_modified,
            raw.elapsed,
            Some(ResponseFailure::Transport(error)),
        )
    }

    fn propagate_cookies(&self, url: &str, headers: &HeaderMap) {
        let Some(store) = &self.cookies else {
            return;
        };
        for value in headers.get_all(SET_COOKIE) {
            match value.to_str() {
                Ok(raw) => store.store(url, raw),
                Err(_) => {
                    tracing::warn!(target: targets::PIPELINE, url, "skipping non-ASCII Set-Cookie header");
                }
            }
        }
    }
}

impl Default for ResponsePipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl std::fmt::Debug for ResponsePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponsePipeline")
            .field("config", &self.config)
            .field("cookies", &self.cookies.is_some())
            .finish()
    }
}

fn pipeline_failure(
    status: u16,
    headers: HeaderMap,
    not_modified: bool,
    elapsed: Duration,
    err: PipelineError,
) -> ApiResponse {
    tracing::debug!(target: targets::PIPELINE, status, error = %err, "response body rejected");
    ApiResponse::new(
        Some(status),
        headers,
        None,
        not_modified,
        elapsed,
        Some(ResponseFailure::Pipeline(err)),
    )
}

/// Inflate a gzip body in full. Never yields a partial body.
fn decompress(headers: &HeaderMap, body: Bytes, not_modified: bool) -> Result<Bytes, PipelineError> {
    let gzip = headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("gzip"));

    if !gzip || not_modified || body.is_empty() {
        return Ok(body);
    }

    let mut inflated = Vec::with_capacity(body.len() * 2);
    GzDecoder::new(body.as_ref())
        .read_to_end(&mut inflated)
        .map_err(|e| PipelineError::Decompression(e.to_string()))?;
    Ok(Bytes::from(inflated))
}

/// Extract the `charset` parameter from a `Content-Type` header.
fn charset_label(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

fn decode(headers: &HeaderMap, body: &[u8], strict: bool) -> Result<String, PipelineError> {
    let encoding: &'static Encoding = match charset_label(headers) {
        None => UTF_8,
        Some(label) => match Encoding::for_label(label.as_bytes()) {
            Some(encoding) => encoding,
            None if strict => return Err(PipelineError::Encoding(label)),
            None => {
                tracing::warn!(target: targets::PIPELINE, charset = %label, "unknown charset, decoding as UTF-8");
                UTF_8
            }
        },
    };

    let (text, _, _) = encoding.decode(body);
    Ok(text.into_owned())
}
