//! Cookie propagation from responses.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::cookie::{CookieStore as _, Jar};
use tether_core::logging::targets;
use url::Url;

/// Receives every `Set-Cookie` header seen by the response pipeline.
pub trait CookieStore: Send + Sync {
    /// Store one raw `Set-Cookie` header value received from `url`.
    fn store(&self, url: &str, set_cookie: &str);

    /// Render a `Cookie` request header for `url`, if any cookies apply.
    fn cookie_header(&self, url: &str) -> Option<String> {
        let _ = url;
        None
    }
}

/// An in-memory cookie store backed by reqwest's cookie jar.
///
/// `Domain`, `Path`, `Secure`, `Expires` and `Max-Age` are honored when
/// matching cookies to a request URL.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    jar: RwLock<Arc<Jar>>,
}

impl MemoryCookieStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The jar currently in use, e.g. for `reqwest::ClientBuilder::cookie_provider`.
    ///
    /// [`clear`](Self::clear) swaps in a fresh jar; handles taken before keep
    /// the old cookies.
    pub fn jar(&self) -> Arc<Jar> {
        self.jar.read().clone()
    }

    /// The value of cookie `name` as it would be sent to `url`.
    pub fn get(&self, url: &str, name: &str) -> Option<String> {
        self.pairs(url)
            .into_iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }

    /// Number of cookies that would be sent to `url`.
    pub fn len_for(&self, url: &str) -> usize {
        self.pairs(url).len()
    }

    /// Remove every stored cookie.
    pub fn clear(&self) {
        *self.jar.write() = Arc::new(Jar::default());
    }

    fn pairs(&self, url: &str) -> Vec<(String, String)> {
        let Some(header) = self.cookie_header(url) else {
            return Vec::new();
        };
        header
            .split("; ")
            .filter_map(|pair| pair.split_once('='))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }
}

impl CookieStore for MemoryCookieStore {
    fn store(&self, url: &str, set_cookie: &str) {
        match Url::parse(url) {
            Ok(url) => self.jar.read().add_cookie_str(set_cookie, &url),
            Err(err) => {
                tracing::debug!(target: targets::PIPELINE, url, error = %err, "cookie for unparsable URL dropped");
            }
        }
    }

    fn cookie_header(&self, url: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        let header = self.jar.read().cookies(&url)?;
        header.to_str().ok().map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_header(store: &MemoryCookieStore, url: &str) -> Option<String> {
        store.cookie_header(url).map(|header| {
            let mut pairs: Vec<_> = header.split("; ").collect();
            pairs.sort_unstable();
            pairs.join("; ")
        })
    }

    #[test]
    fn test_store_and_render() {
        let store = MemoryCookieStore::new();
        store.store("http://x/a", "session=abc; Path=/; HttpOnly");
        store.store("http://x/b", "theme=dark");

        assert_eq!(store.get("http://x/", "session").as_deref(), Some("abc"));
        assert_eq!(store.len_for("http://x/"), 2);
        assert_eq!(
            sorted_header(&store, "http://x/anything").as_deref(),
            Some("session=abc; theme=dark")
        );
    }

    #[test]
    fn test_hosts_are_isolated() {
        let store = MemoryCookieStore::new();
        store.store("http://a.example/", "k=1");
        assert_eq!(store.cookie_header("http://b.example/"), None);
    }

    #[test]
    fn test_max_age_zero_removes() {
        let store = MemoryCookieStore::new();
        store.store("http://x/", "k=1");
        store.store("http://x/", "k=; Max-Age=0");
        assert_eq!(store.get("http://x/", "k"), None);
        assert_eq!(store.cookie_header("http://x/"), None);
    }

    #[test]
    fn test_garbage_is_ignored() {
        let store = MemoryCookieStore::new();
        store.store("http://x/", "no-equals-sign");
        store.store("not a url", "k=1");
        assert_eq!(store.len_for("http://x/"), 0);
    }

    #[test]
    fn test_path_scoped_cookie_stays_on_its_path() {
        let store = MemoryCookieStore::new();
        store.store("https://x.example/admin/login", "adm=1; Path=/admin");

        assert_eq!(store.get("https://x.example/admin/users", "adm").as_deref(), Some("1"));
        assert_eq!(store.cookie_header("https://x.example/public"), None);
    }

    #[test]
    fn test_secure_cookie_only_over_https() {
        let store = MemoryCookieStore::new();
        store.store("https://x.example/", "sid=s; Secure");
        store.store("https://x.example/", "wide=1");

        assert_eq!(
            sorted_header(&store, "https://x.example/").as_deref(),
            Some("sid=s; wide=1")
        );
        assert_eq!(store.cookie_header("http://x.example/").as_deref(), Some("wide=1"));
    }

    #[test]
    fn test_expired_cookie_is_not_sent() {
        let store = MemoryCookieStore::new();
        store.store("http://x.example/", "old=1; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        store.store("http://x.example/", "wide=1");

        assert_eq!(store.get("http://x.example/", "old"), None);
        assert_eq!(store.cookie_header("http://x.example/").as_deref(), Some("wide=1"));
    }

    #[test]
    fn test_domain_cookie_reaches_subdomains() {
        let store = MemoryCookieStore::new();
        store.store("http://www.x.example/", "d=1; Domain=x.example");
        store.store("http://www.x.example/", "host=1");

        assert_eq!(store.cookie_header("http://api.x.example/").as_deref(), Some("d=1"));
    }

    #[test]
    fn test_clear_swaps_the_jar() {
        let store = MemoryCookieStore::new();
        store.store("http://x/", "k=1");
        store.clear();
        assert_eq!(store.len_for("http://x/"), 0);
    }
}
