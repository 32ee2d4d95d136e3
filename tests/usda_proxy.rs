// USDA search proxying through the full router
mod common;

use std::sync::Arc;

use axum::body::Body;
use common::*;
use http::{Method, Request, StatusCode};
use serde_json::json;

const USDA_BODY: &str = r#"{"totalHits":1,"foods":[{"fdcId":1750340,"description":"Apples, fuji"}]}"#;

fn usda_upstream() -> Arc<FakeUpstream> {
    Arc::new(FakeUpstream::new().respond("/foods/search", StatusCode::OK, USDA_BODY))
}

#[tokio::test]
async fn test_search_passes_body_through_with_cache_and_cors() {
    let upstream = usda_upstream();
    let app = app(upstream.clone());

    let response = get(&app, "/usda/search?query=apple").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), USDA_BODY);
    assert_eq!(response.header("cache-control"), Some("s-maxage=300"));
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert!(response.header("x-upstream-only").is_none());
    assert_cors(&response);
}

#[tokio::test]
async fn test_upstream_request_carries_key_and_fixed_filters() {
    let upstream = usda_upstream();
    let app = app(upstream.clone());

    get(&app, "/usda/search?query=cheddar%20cheese&api_key=attacker").await;

    let requests = upstream.requests();
    assert_eq!(requests.len(), 1);
    let sent = &requests[0];
    assert_eq!(sent.path(), "/fdc/v1/foods/search");
    assert_eq!(sent.query_param("query").as_deref(), Some("cheddar cheese"));
    assert_eq!(sent.query_param("dataType").as_deref(), Some("Foundation"));
    assert_eq!(sent.query_param("pageSize").as_deref(), Some("20"));
    assert_eq!(sent.query_param("api_key").as_deref(), Some("TEST_KEY"));
    assert!(sent.query_param("pageNumber").is_none());
}

#[tokio::test]
async fn test_page_number_is_forwarded() {
    let upstream = usda_upstream();
    let app = app(upstream.clone());

    get(&app, "/usda/search?query=rice&pageNumber=4").await;

    assert_eq!(
        upstream.requests()[0].query_param("pageNumber").as_deref(),
        Some("4")
    );
}

#[tokio::test]
async fn test_missing_or_empty_query_is_rejected() {
    let upstream = usda_upstream();
    let app = app(upstream.clone());

    for uri in ["/usda/search", "/usda/search?query=", "/usda/search?q=apple"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(response.json(), json!({ "error": "Missing ?query parameter" }));
        assert_cors(&response);
    }
    assert_eq!(upstream.request_count(), 0);
}

#[tokio::test]
async fn test_unknown_sub_route_is_rejected() {
    let upstream = usda_upstream();
    let app = app(upstream.clone());

    let response = get(&app, "/usda/foods?query=apple").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json(),
        json!({ "error": "Invalid endpoint. Use /usda/search" })
    );
    assert_eq!(upstream.request_count(), 0);
}

#[tokio::test]
async fn test_extra_or_empty_segments_never_reach_upstream() {
    let upstream = usda_upstream();
    let app = app(upstream.clone());

    for uri in [
        "/usda/search/extra?query=apple",
        "/usda//search?query=apple",
        "/usda/search/?query=apple",
    ] {
        let response = get(&app, uri).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(
            response.json(),
            json!({ "error": "Invalid endpoint. Use /usda/search" })
        );
    }
    assert_eq!(upstream.request_count(), 0);
}

#[tokio::test]
async fn test_legacy_root_query_is_a_usda_search() {
    let upstream = usda_upstream();
    let app = app(upstream.clone());

    let response = get(&app, "/?query=banana&pageNumber=2").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), USDA_BODY);
    let sent = &upstream.requests()[0];
    assert_eq!(sent.query_param("query").as_deref(), Some("banana"));
    assert_eq!(sent.query_param("pageNumber").as_deref(), Some("2"));
}

#[tokio::test]
async fn test_root_without_query_is_not_found() {
    let upstream = usda_upstream();
    let app = app(upstream.clone());

    for uri in ["/", "/?query=", "/?search=banana"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(
            response.text(),
            "Not found. Use /usda/search or /off/search endpoints."
        );
        assert_cors(&response);
    }
    assert_eq!(upstream.request_count(), 0);
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = app(usda_upstream());

    let response = get(&app, "/unknown-path").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.header("content-type"),
        Some("text/plain; charset=utf-8")
    );
    assert_eq!(
        response.text(),
        "Not found. Use /usda/search or /off/search endpoints."
    );
}

#[tokio::test]
async fn test_upstream_error_status_becomes_bad_gateway() {
    let upstream = Arc::new(FakeUpstream::new().respond(
        "/foods/search",
        StatusCode::FORBIDDEN,
        r#"{"error":{"code":"API_KEY_INVALID"}}"#,
    ));
    let app = app(upstream);

    let response = get(&app, "/usda/search?query=apple").await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        response.json(),
        json!({ "error": "USDA API error", "status": 403 })
    );
    assert!(response.header("cache-control").is_none());
    assert_cors(&response);
}

#[tokio::test]
async fn test_transport_failure_is_internal_error() {
    let app = app(Arc::new(FakeUpstream::unreachable()));

    let response = get(&app, "/usda/search?query=apple").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json(),
        json!({ "error": "Failed to fetch data from USDA API" })
    );
    assert!(!response.text().contains("connection refused"));
}

#[tokio::test]
async fn test_preflight_never_reaches_upstream() {
    let upstream = usda_upstream();
    let app = app(upstream.clone());

    let response = send(
        &app,
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/usda/search?query=apple")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert!(response.body.is_empty());
    assert_cors(&response);
    assert_eq!(upstream.request_count(), 0);
}
