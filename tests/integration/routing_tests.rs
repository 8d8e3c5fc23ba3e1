//! Routing integration tests.
//!
//! Tests verify:
//! - Exact-match dispatch at the root and under the `/api` alias
//! - 404 for unknown paths and 405 with `Allow` for method mismatches
//! - Group middleware isolation and onion ordering
//! - The fault boundary

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use http_body_util::BodyExt;
use tower::ServiceExt;

use adm_backend::router::{from_fn, handler_fn, MiddlewareChain, Next, Router};
use adm_backend::server::{Recover, RequestId};

use super::test_utils::{app, json, request, send, test_config};

fn get(uri: &str) -> Request {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(service: adm_backend::RouterService, req: Request) -> (StatusCode, String) {
    let response = service.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

// =============================================================================
// End-to-End Dispatch
// =============================================================================

#[tokio::test]
async fn test_healthz_at_root_and_alias() {
    let app = app(test_config());

    for uri in ["/healthz", "/api/healthz"] {
        let (status, headers, body) = send(&app, request("GET", uri)).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(headers.get("content-type").unwrap(), "application/json");
        assert_eq!(json(&body), serde_json::json!({"status": "ok"}));
    }
}

#[tokio::test]
async fn test_method_not_allowed_lists_methods() {
    let app = app(test_config());

    let (status, headers, body) = send(&app, request("POST", "/healthz")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(headers.get("allow").unwrap(), "GET");
    assert!(headers.get("content-type").is_none());
    assert!(body.is_empty());

    let (status, headers, _) = send(&app, request("DELETE", "/api/admin/sessions")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(headers.get("allow").unwrap(), "GET, POST");
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = app(test_config());

    let (status, headers, body) = send(&app, request("GET", "/unknown")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(headers.get("allow").is_none());
    assert!(headers.get("content-type").is_none());
    assert!(body.is_empty());

    let (status, _, _) = send(&app, request("GET", "/api")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_paths_are_normalized() {
    let app = app(test_config());

    let (status, _, _) = send(&app, request("GET", "/healthz/")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, request("GET", "/api/healthz?probe=1")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_per_response() {
    let app = app(test_config());

    let (_, first, _) = send(&app, request("GET", "/healthz")).await;
    let (_, second, _) = send(&app, request("GET", "/unknown")).await;

    let first = first.get("x-request-id").unwrap().to_str().unwrap().to_string();
    let second = second.get("x-request-id").unwrap().to_str().unwrap().to_string();
    assert!(first.starts_with("req-"));
    assert_ne!(first, second);
}

// =============================================================================
// Groups and Middleware
// =============================================================================

fn tag(name: &'static str) -> impl adm_backend::Middleware {
    from_fn(move |req: Request, next: Next| async move {
        let mut response = next.run(req).await;
        response
            .headers_mut()
            .append("x-tags", name.parse().unwrap());
        response
    })
}

#[tokio::test]
async fn test_group_middleware_isolation() {
    let router = Router::builder()
        .routes(|root| {
            root.layer(tag("root"));
            root.get("/outside", handler_fn(|_req: Request| async { "outside" }));
            root.group("/admin", |admin| {
                admin.layer(tag("admin"));
                admin.get("/inside", handler_fn(|_req: Request| async { "inside" }));
            });
            root.get("/after", handler_fn(|_req: Request| async { "after" }));
        })
        .build()
        .unwrap();
    let service = router.into_service(MiddlewareChain::new());

    let tags = |response: &axum::response::Response| -> Vec<String> {
        response
            .headers()
            .get_all("x-tags")
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    };

    let response = service.clone().oneshot(get("/outside")).await.unwrap();
    assert_eq!(tags(&response), vec!["root"]);

    let response = service.clone().oneshot(get("/admin/inside")).await.unwrap();
    assert_eq!(tags(&response), vec!["admin", "root"]);

    let response = service.oneshot(get("/after")).await.unwrap();
    assert_eq!(tags(&response), vec!["root"]);
}

#[tokio::test]
async fn test_onion_order() {
    let log = Arc::new(Mutex::new(Vec::<String>::new()));

    let recorder = |name: &'static str| {
        let log = Arc::clone(&log);
        from_fn(move |req: Request, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("{}>", name));
                let response = next.run(req).await;
                log.lock().unwrap().push(format!("<{}", name));
                response
            }
        })
    };

    let handler_log = Arc::clone(&log);
    let router = Router::builder()
        .routes(|root| {
            root.layer(recorder("A"));
            root.layer(recorder("B"));
            root.layer(recorder("C"));
            root.get(
                "/h",
                handler_fn(move |_req: Request| {
                    let log = Arc::clone(&handler_log);
                    async move {
                        log.lock().unwrap().push("H".to_string());
                        StatusCode::NO_CONTENT
                    }
                }),
            );
        })
        .build()
        .unwrap();

    let response = router
        .into_service(MiddlewareChain::new())
        .oneshot(get("/h"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["A>", "B>", "C>", "H", "<C", "<B", "<A"]
    );
}

#[tokio::test]
async fn test_last_registration_wins() {
    let router = Router::builder()
        .routes(|root| {
            root.get("/dup", handler_fn(|_req: Request| async { "first" }));
            root.get("/dup/", handler_fn(|_req: Request| async { "second" }));
        })
        .build()
        .unwrap();

    let (status, body) = body_text(router.into_service(MiddlewareChain::new()), get("/dup")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "second");
}

// =============================================================================
// Fault Boundary
// =============================================================================

#[tokio::test]
async fn test_panicking_handler_becomes_500() {
    let router = Router::builder()
        .routes(|root| {
            root.get(
                "/boom",
                handler_fn(|_req: Request| async {
                    if true {
                        panic!("handler exploded");
                    }
                    "unreachable"
                }),
            );
            root.get("/fine", handler_fn(|_req: Request| async { "fine" }));
        })
        .build()
        .unwrap();

    let front = MiddlewareChain::new().with(Recover).with(RequestId::new());
    let service = router.into_service(front);

    let (status, body) = body_text(service.clone(), get("/boom")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.contains("exploded"));

    let (status, body) = body_text(service, get("/fine")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "fine");
}
