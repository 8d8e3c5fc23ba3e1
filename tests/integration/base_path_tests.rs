//! Base path integration tests.
//!
//! Tests verify:
//! - Requests under the base path are routed by their internal path
//! - Requests outside the base path are answered 404 before CORS/dispatch
//! - The query string survives the rewrite

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{OriginalUri, Request};
use axum::http::StatusCode;
use http_body_util::BodyExt;
use tower::ServiceExt;

use adm_backend::router::{handler_fn, MiddlewareChain, Router};
use adm_backend::server::BasePathRewriter;

use super::test_utils::{app, json, request, send, test_config};

#[tokio::test]
async fn test_prefixed_requests_are_rewritten() {
    let app = app(test_config().with_base_path("/adm"));

    let (status, _, body) = send(&app, request("GET", "/adm/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "ok");

    let (status, _, _) = send(&app, request("GET", "/adm/api/healthz")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, _) = send(&app, request("POST", "/adm/healthz")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(headers.get("allow").unwrap(), "GET");
}

#[tokio::test]
async fn test_outside_base_path_is_not_found() {
    let app = app(test_config().with_base_path("/adm"));

    let (status, headers, body) = send(&app, request("GET", "/healthz")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(headers.get("content-type").is_none());
    assert!(body.is_empty());

    let (status, _, _) = send(&app, request("GET", "/other/healthz")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_outside_base_path_skips_cors_preflight() {
    let app = app(test_config().with_base_path("/adm"));

    let req = Request::builder()
        .method("OPTIONS")
        .uri("/elsewhere")
        .header("origin", "http://localhost:8080")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(headers.get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_rewrite_keeps_query_and_original_uri() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let router = Router::builder()
        .routes(|root| {
            root.get(
                "/foo",
                handler_fn(move |req: Request| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let seen = format!(
                        "{} {}",
                        req.uri(),
                        req.extensions()
                            .get::<OriginalUri>()
                            .map(|o| o.0.to_string())
                            .unwrap_or_default()
                    );
                    async move { seen }
                }),
            );
        })
        .build()
        .unwrap();

    let front = MiddlewareChain::new().with(BasePathRewriter::new("/prefix").unwrap());
    let service = router.into_service(front);

    let req = Request::builder()
        .uri("/prefix/foo?x=1")
        .body(Body::empty())
        .unwrap();
    let response = service.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"/foo?x=1 /prefix/foo?x=1");

    let req = Request::builder()
        .uri("/other/foo")
        .body(Body::empty())
        .unwrap();
    let response = service.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_root_base_path_is_pass_through() {
    let app = app(test_config().with_base_path("/"));
    let (status, _, _) = send(&app, request("GET", "/healthz")).await;
    assert_eq!(status, StatusCode::OK);
}
