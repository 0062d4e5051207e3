//! Tests for the reqwest transport adapter.

mod common;

use std::time::Duration;

use tether_net::http::{
    HttpClientBuilder, HttpMethod, RequestDescriptor, RetryPolicy, TransportRequest,
};

#[test]
fn test_builder_with_proxy() {
    let transport = HttpClientBuilder::new()
        .proxy("http://127.0.0.1:3128")
        .user_agent("tether-tests")
        .max_redirects(3)
        .build();
    assert!(transport.is_ok());
}

#[test]
fn test_invalid_proxy_is_rejected() {
    let result = HttpClientBuilder::new().proxy("::not a proxy::").build();
    assert!(matches!(result, Err(tether_net::NetworkError::Proxy(_))));
}

#[test]
fn test_transport_request_from_descriptor() {
    let descriptor =
        RequestDescriptor::with_query(HttpMethod::Delete, "http://x/items", [("id", "4")], 4)
            .unwrap()
            .header("X-Trace", "t-1");
    let request = TransportRequest::from_descriptor(&descriptor, RetryPolicy::default());

    assert_eq!(request.method, HttpMethod::Delete);
    assert_eq!(request.url, "http://x/items?id=4");
    assert_eq!(request.body, None);
    assert_eq!(request.headers.get("x-trace").unwrap(), "t-1");
    assert_eq!(request.retry.initial_timeout, Duration::from_millis(5000));
}

// Note: We use wiremock for mocked HTTP tests
#[cfg(feature = "integration-tests")]
mod integration_tests {
    use super::*;
    use crate::common::*;
    use std::sync::Arc;
    use tether_core::{OverlayView, OwnerKind};
    use tether_net::NetworkError;
    use tether_net::http::{CookieStore, MemoryCookieStore, Outcome, Transport};
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(method: HttpMethod, url: String, body: Option<&str>) -> TransportRequest {
        TransportRequest {
            method,
            url,
            headers: http::HeaderMap::new(),
            body: body.map(str::to_string),
            retry: RetryPolicy::default(),
        }
    }

    #[tokio::test]
    async fn test_get_with_query_and_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/items"))
            .and(query_param("page", "2"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[1,2]"))
            .mount(&mock_server)
            .await;

        let descriptor = RequestDescriptor::with_query(
            HttpMethod::Get,
            format!("{}/items", mock_server.uri()),
            [("page", "2")],
            1,
        )
        .unwrap()
        .header("Accept", "application/json");

        let transport = HttpClientBuilder::new().build().unwrap();
        let raw = transport
            .submit(TransportRequest::from_descriptor(&descriptor, RetryPolicy::default()))
            .await
            .expect("Request failed");

        assert_eq!(raw.status, 200);
        assert_eq!(raw.body.as_ref(), b"[1,2]");
        assert!(!raw.not_modified);
    }

    #[tokio::test]
    async fn test_post_body_is_sent_verbatim() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/users"))
            .and(body_string("{\"name\":\"John\"}"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = HttpClientBuilder::new().build().unwrap();
        let raw = transport
            .submit(request(
                HttpMethod::Post,
                format!("{}/api/users", mock_server.uri()),
                Some("{\"name\":\"John\"}"),
            ))
            .await
            .expect("Request failed");

        assert_eq!(raw.status, 201);
    }

    #[tokio::test]
    async fn test_error_status_carries_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(
                ResponseTemplate::new(404)
                    .insert_header("set-cookie", "seen=1")
                    .set_body_string("not here"),
            )
            .mount(&mock_server)
            .await;

        let transport = HttpClientBuilder::new().build().unwrap();
        let failure = transport
            .submit(request(HttpMethod::Get, format!("{}/missing", mock_server.uri()), None))
            .await
            .unwrap_err();

        assert_eq!(failure.error, NetworkError::HttpStatus { status: 404 });
        let raw = failure.response.expect("server response");
        assert_eq!(raw.status, 404);
        assert_eq!(raw.body.as_ref(), b"not here");
        assert!(raw.headers.contains_key("set-cookie"));
    }

    #[tokio::test]
    async fn test_not_modified_is_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/etag"))
            .respond_with(ResponseTemplate::new(304).insert_header("etag", "\"v2\""))
            .mount(&mock_server)
            .await;

        let transport = HttpClientBuilder::new().build().unwrap();
        let raw = transport
            .submit(request(HttpMethod::Get, format!("{}/etag", mock_server.uri()), None))
            .await
            .expect("304 is not a failure");

        assert!(raw.not_modified);
    }

    #[tokio::test]
    async fn test_timeouts_are_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&mock_server)
            .await;

        let transport = HttpClientBuilder::new().build().unwrap();
        let mut slow = request(HttpMethod::Get, format!("{}/slow", mock_server.uri()), None);
        slow.retry = RetryPolicy {
            max_retries: 1,
            initial_timeout: Duration::from_millis(50),
            backoff_multiplier: 1.0,
        };

        let failure = transport.submit(slow).await.unwrap_err();
        assert_eq!(failure.error, NetworkError::Timeout);
        assert!(failure.response.is_none());

        let received = mock_server.received_requests().await.unwrap_or_default();
        assert_eq!(received.len(), 2);
    }

    #[tokio::test]
    async fn test_connection_refused_is_not_retried() {
        let transport = HttpClientBuilder::new().build().unwrap();
        let failure = transport
            .submit(request(HttpMethod::Get, "http://127.0.0.1:1/".to_string(), None))
            .await
            .unwrap_err();
        assert!(matches!(failure.error, NetworkError::Connection(_)));
    }

    #[tokio::test]
    async fn test_cookie_header_is_attached() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("cookie", "session=abc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let cookies = Arc::new(MemoryCookieStore::new());
        cookies.store(&mock_server.uri(), "session=abc; Path=/");

        let transport = HttpClientBuilder::new()
            .build()
            .unwrap()
            .with_cookie_store(cookies);
        let raw = transport
            .submit(request(HttpMethod::Get, format!("{}/me", mock_server.uri()), None))
            .await
            .expect("Request failed");
        assert_eq!(raw.status, 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dispatch_through_reqwest() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/b"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-encoding", "gzip")
                    .insert_header("set-cookie", "token=xyz")
                    .set_body_bytes(gzip("{\"k\":1}")),
            )
            .mount(&mock_server)
            .await;

        let h = Harness::new(OwnerKind::Screen);
        let cookies = Arc::new(MemoryCookieStore::new());
        let dispatcher = h
            .builder()
            .transport(Arc::new(HttpClientBuilder::new().build().unwrap()))
            .cookie_store(cookies.clone())
            .build()
            .unwrap();

        let url = format!("{}/b", mock_server.uri());
        let handle = dispatcher.request_api(post(&url, "{}", 3)).unwrap();
        assert!(h.overlay().is_visible());
        h.settle(&handle);

        assert!(matches!(handle.outcome(), Some(Outcome::Delivered(_))));
        assert_eq!(
            h.events()[0],
            Event::Finished(HttpMethod::Post, Some("{\"k\":1}".into()))
        );
        assert!(!h.overlay().is_visible());
        assert_eq!(cookies.get(&url, "token").as_deref(), Some("xyz"));
    }
}
