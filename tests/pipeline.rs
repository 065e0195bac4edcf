//! Pipeline tests against a mock upstream.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use docs_proxy::cache::CacheGateway;
use docs_proxy::config::{ErrorStatusMode, HeaderPolicy, PathValidation};
use docs_proxy::DocsProxy;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

use common::{body_string, get, test_config, CountingStore, BASE_PATH};

const HTML: &str = "<!DOCTYPE html><html><head><title>Gemini API</title></head>\
<body><devsite-toc><a href=\"#intro\"><span>Intro</span></a></devsite-toc><p>docs</p></body></html>";

fn proxy(server: &MockServer) -> DocsProxy {
    DocsProxy::from_config(&test_config(server)).unwrap()
}

#[tokio::test]
async fn test_remainder_and_query_reach_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{BASE_PATH}/quickstart")))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let handled = proxy(&server).handle(get("/zh-CN/docs/quickstart?foo=bar")).await;
    assert_eq!(handled.response.status(), StatusCode::OK);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].url.query(), Some("foo=bar&hl=zh-cn"));
}

#[tokio::test]
async fn test_bare_docs_path_targets_base() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(BASE_PATH))
        .and(query_param("hl", "ja-jp"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let handled = proxy(&server).handle(get("/ja-JP/docs")).await;
    assert_eq!(handled.response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_inbound_hl_is_replaced_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    proxy(&server).handle(get("/EN/docs/models?hl=fr&x=1&hl=de")).await;

    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].url.path(), format!("{BASE_PATH}/models"));
    assert_eq!(received[0].url.query(), Some("hl=en&x=1"));
}

#[tokio::test]
async fn test_non_get_never_reaches_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/zh-CN/docs")
        .body(Body::empty())
        .unwrap();
    let handled = proxy(&server).handle(request).await;

    assert_eq!(handled.response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_string(handled.response).await, "");
}

#[tokio::test]
async fn test_invalid_path_never_reaches_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let proxy = proxy(&server);
    for uri in ["/zh-CN", "/zh-CN/api/models", "/docs/zh-CN"] {
        let handled = proxy.handle(get(uri)).await;
        assert_eq!(handled.response.status(), StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(body_string(handled.response).await, "Invalid path");
    }
}

#[tokio::test]
async fn test_dot_segments_never_reach_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let proxy = proxy(&server);
    for uri in ["/en/docs/../../../secret", "/en/docs/%2e%2e/%2e%2e/admin", "/en/docs/./x"] {
        let handled = proxy.handle(get(uri)).await;
        assert_eq!(handled.response.status(), StatusCode::FORBIDDEN, "{uri}");
        assert!(handled.background.is_none());
        assert_eq!(body_string(handled.response).await, "Invalid path");
    }
}

#[tokio::test]
async fn test_strict_validation_forbids_deep_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.routing.validation = PathValidation::Strict;
    let proxy = DocsProxy::from_config(&config).unwrap();

    let denied = proxy.handle(get("/en/docs/a/b/c")).await;
    assert_eq!(denied.response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_string(denied.response).await, "Forbidden");

    let allowed = proxy.handle(get("/en/docs/a/b")).await;
    assert_eq!(allowed.response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upstream_error_becomes_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let handled = proxy(&server).handle(get("/en/docs/broken")).await;
    let response = handled.response;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(body_string(response).await, "Failed to fetch target URL");
    assert!(handled.background.is_none());
}

#[tokio::test]
async fn test_pass_through_keeps_upstream_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.upstream.on_error_status = ErrorStatusMode::PassThrough;
    let handled = DocsProxy::from_config(&config).unwrap().handle(get("/en/docs/missing")).await;

    assert_eq!(handled.response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(handled.response).await, "not here");
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.upstream.timeout_secs = 1;
    let proxy = DocsProxy::from_config(&config).unwrap();

    let started = std::time::Instant::now();
    let handled = proxy.handle(get("/en/docs/slow")).await;
    assert_eq!(handled.response.status(), StatusCode::BAD_GATEWAY);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_second_request_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(HTML, "text/html; charset=utf-8"))
        .expect(1)
        .mount(&server)
        .await;

    let store = CountingStore::new();
    let proxy = DocsProxy::new(&test_config(&server), CacheGateway::new(Arc::new(store.clone()))).unwrap();

    let first = proxy.handle(get("/zh-CN/docs/quickstart?foo=bar")).await;
    let first_status = first.response.status();
    let first_body = body_string(first.response).await;
    first.background.expect("cache write scheduled").wait().await;

    let second = proxy.handle(get("/zh-CN/docs/quickstart?foo=bar")).await;
    assert!(second.background.is_none());
    assert_eq!(second.response.status(), first_status);
    assert_eq!(second.response.headers()[header::CACHE_CONTROL], "public, max-age=3600");
    assert_eq!(body_string(second.response).await, first_body);

    assert_eq!(store.lookups(), 2);
    assert_eq!(store.hits(), 1);
    assert_eq!(store.stores(), 1);
}

#[tokio::test]
async fn test_query_order_is_a_different_cache_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("doc"))
        .expect(2)
        .mount(&server)
        .await;

    let proxy = proxy(&server);
    let first = proxy.handle(get("/en/docs?a=1&b=2")).await;
    if let Some(task) = first.background {
        task.wait().await;
    }
    let second = proxy.handle(get("/en/docs?b=2&a=1")).await;
    assert!(second.background.is_some());
}

#[tokio::test]
async fn test_redirect_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", "https://ai.google.dev/gemini-api/docs/new"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let handled = proxy(&server).handle(get("/en/docs/old")).await;
    let response = handled.response;

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://ai.google.dev/gemini-api/docs/new"
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_edge_headers_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Cache-Control", "private, no-store")
                .set_body_string("plain"),
        )
        .mount(&server)
        .await;

    let handled = proxy(&server).handle(get("/en/docs")).await;
    let headers = handled.response.headers();

    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=3600");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, OPTIONS");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "*");
}

#[tokio::test]
async fn test_html_is_rewritten() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(HTML, "text/html; charset=utf-8"))
        .mount(&server)
        .await;

    let handled = proxy(&server).handle(get("/en/docs")).await;
    assert!(handled.response.headers().get(header::CONTENT_LENGTH).is_none());
    let body = body_string(handled.response).await;

    assert!(body.contains("<title>Gemini API</title><meta name=\"viewport\" content=\"width=1920\"><style>"));
    assert!(body.contains("@media screen and (min-width: 1024px)"));
    assert!(body.contains("<p>docs</p><style>"));
    assert!(body.contains("<devsite-toc><a href=\"#intro\"><span>Intro</span></a></devsite-toc>"));
}

#[tokio::test]
async fn test_non_html_bypasses_rewriting() {
    let server = MockServer::start().await;
    let json = r#"{"head":"<head></head>"}"#;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(json, "application/json"))
        .mount(&server)
        .await;

    let handled = proxy(&server).handle(get("/en/docs/data.json")).await;
    assert_eq!(body_string(handled.response).await, json);
}

#[tokio::test]
async fn test_rewriting_can_be_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(HTML, "text/html"))
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.rewrite.enabled = false;
    let handled = DocsProxy::from_config(&config).unwrap().handle(get("/en/docs")).await;
    assert_eq!(body_string(handled.response).await, HTML);
}

#[tokio::test]
async fn test_header_policies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let request = || {
        Request::builder()
            .uri("/en/docs")
            .header("User-Agent", "docs-client/1.0")
            .header("Cookie", "sid=1")
            .header("Accept-Language", "en-US")
            .body(Body::empty())
            .unwrap()
    };

    let mut config = test_config(&server);
    config.cache.enabled = false;
    DocsProxy::from_config(&config).unwrap().handle(request()).await;

    config.upstream.header_policy = HeaderPolicy::Browser;
    DocsProxy::from_config(&config).unwrap().handle(request()).await;

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);

    let minimal = &received[0].headers;
    assert_eq!(minimal[header::USER_AGENT], "docs-client/1.0");
    assert_eq!(minimal[header::ACCEPT], "*/*");
    assert!(minimal.get(header::COOKIE).is_none());
    assert!(minimal.get(header::ACCEPT_LANGUAGE).is_none());

    let browser = &received[1].headers;
    assert_eq!(browser[header::COOKIE], "sid=1");
    assert_eq!(browser[header::ACCEPT_LANGUAGE], "en-US");
    assert_eq!(browser[header::PRAGMA], "no-cache");
    assert!(browser.get(header::REFERER).is_some());
}
