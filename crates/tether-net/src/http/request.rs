//! Request descriptors.

use std::collections::HashMap;

use url::form_urlencoded;

use crate::error::DescriptorError;

/// HTTP request methods routed by the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method.
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
}

impl HttpMethod {
    /// Convert to reqwest method.
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }

    /// Whether this method carries its parameters in the query string.
    pub fn uses_query(self) -> bool {
        matches!(self, Self::Get | Self::Delete)
    }

    /// Whether this method carries a literal body.
    pub fn uses_body(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// Describes one HTTP call issued on behalf of an owner.
///
/// Built with [`RequestDescriptor::with_query`] for GET/DELETE or
/// [`RequestDescriptor::with_body`] for POST/PUT, then refined with the
/// chaining setters:
///
/// ```
/// use tether_net::http::{HttpMethod, RequestDescriptor};
///
/// let descriptor = RequestDescriptor::with_query(
///     HttpMethod::Get,
///     "https://api.example.com/items",
///     [("page", "2")],
///     7,
/// )
/// .unwrap()
/// .header("Accept", "application/json")
/// .show_progress(false);
///
/// assert_eq!(descriptor.url(), "https://api.example.com/items?page=2");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: HttpMethod,
    url: String,
    query: Vec<(String, String)>,
    body: Option<String>,
    headers: HashMap<String, String>,
    id: i32,
    show_progress: bool,
    check_error: bool,
    dialog_listener_id: Option<i32>,
}

impl RequestDescriptor {
    /// Describe a GET or DELETE call.
    ///
    /// `query` is encoded onto `url` in order. Fails with
    /// [`DescriptorError::InvalidArgument`] for POST or PUT.
    pub fn with_query<K, V>(
        method: HttpMethod,
        url: impl Into<String>,
        query: impl IntoIterator<Item = (K, V)>,
        id: i32,
    ) -> Result<Self, DescriptorError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        if !method.uses_query() {
            return Err(DescriptorError::InvalidArgument(format!(
                "{method} cannot be built with a query; use with_body"
            )));
        }

        let query: Vec<(String, String)> = query
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let url = encode_query(url.into(), &query);

        Ok(Self::new(method, url, query, None, id))
    }

    /// Describe a POST or PUT call whose body is sent verbatim.
    ///
    /// Fails with [`DescriptorError::InvalidArgument`] for GET or DELETE.
    pub fn with_body(
        method: HttpMethod,
        url: impl Into<String>,
        body: Option<String>,
        id: i32,
    ) -> Result<Self, DescriptorError> {
        if !method.uses_body() {
            return Err(DescriptorError::InvalidArgument(format!(
                "{method} cannot carry a body; use with_query"
            )));
        }

        Ok(Self::new(method, url.into(), Vec::new(), body, id))
    }

    fn new(
        method: HttpMethod,
        url: String,
        query: Vec<(String, String)>,
        body: Option<String>,
        id: i32,
    ) -> Self {
        Self {
            method,
            url,
            query,
            body,
            headers: HashMap::new(),
            id,
            show_progress: true,
            check_error: true,
            dialog_listener_id: None,
        }
    }

    /// Add a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add multiple request headers.
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Whether this request drives the owner's busy overlay. Defaults to `true`.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Whether failures reach the error hooks. Defaults to `true`.
    pub fn check_error(mut self, check: bool) -> Self {
        self.check_error = check;
        self
    }

    /// Attach an opaque correlation id for the caller's dialogs.
    pub fn dialog_listener_id(mut self, id: i32) -> Self {
        self.dialog_listener_id = Some(id);
        self
    }

    /// The HTTP method.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The request URL; for GET/DELETE it already contains the query.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The query pairs the URL was built from.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// The literal POST/PUT payload.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// The request headers.
    pub fn header_map(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// The caller-chosen correlation id. Not required to be unique.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Whether the busy overlay is shown for this request.
    pub fn shows_progress(&self) -> bool {
        self.show_progress
    }

    /// Whether failure classification reaches the error hooks.
    pub fn checks_error(&self) -> bool {
        self.check_error
    }

    /// The opaque dialog correlation id, if any.
    pub fn dialog_listener(&self) -> Option<i32> {
        self.dialog_listener_id
    }
}

fn encode_query(mut url: String, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return url;
    }

    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish();

    if url.contains('?') {
        if !url.ends_with('?') && !url.ends_with('&') {
            url.push('&');
        }
    } else {
        url.push('?');
    }
    url.push_str(&encoded);
    url
}
