//! API integration tests for the student and admin endpoints.
//!
//! Tests verify:
//! - Student placeholder endpoints under both mounts
//! - Session creation: validation, authorization, directory failures
//! - Session listing after creation

use axum::http::StatusCode;
use chrono::{Duration, Utc};

use super::test_utils::{
    app, app_with_directory, json, json_request, request, send, test_config, MockDirectory,
};

fn session_window(start_days: i64, end_days: i64) -> serde_json::Value {
    let now = Utc::now();
    serde_json::json!({
        "label": "",
        "start_at": (now + Duration::days(start_days)).to_rfc3339(),
        "end_at": (now + Duration::days(end_days)).to_rfc3339(),
    })
}

fn authorized(mut req: axum::http::Request<axum::body::Body>) -> axum::http::Request<axum::body::Body> {
    req.headers_mut()
        .insert("authorization", "Bearer admin-token".parse().unwrap());
    req.headers_mut()
        .insert("x-user-login", "jdoe".parse().unwrap());
    req
}

// =============================================================================
// Student Endpoints
// =============================================================================

#[tokio::test]
async fn test_student_placeholders() {
    let app = app(test_config());

    for prefix in ["", "/api"] {
        let (status, _, body) =
            send(&app, request("GET", &format!("{}/student/sessions/current", prefix))).await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert!(body["session"].is_null());
        assert_eq!(body["message"], "Student session endpoint placeholder");

        let (status, _, body) = send(
            &app,
            request(
                "POST",
                &format!("{}/student/sessions/current/questionnaire", prefix),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json(&body)["message"], "Questionnaire submission placeholder");

        let (status, _, body) = send(
            &app,
            request("POST", &format!("{}/student/sessions/current/submit", prefix)),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json(&body)["message"], "Submit for validation placeholder");
    }
}

// =============================================================================
// Admin Endpoints
// =============================================================================

#[tokio::test]
async fn test_list_sessions_empty() {
    let app = app(test_config());
    let (status, _, body) = send(&app, request("GET", "/api/admin/sessions")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), serde_json::json!({"sessions": []}));
}

#[tokio::test]
async fn test_create_then_list() {
    let directory = MockDirectory::with_logins(&["bob", "alice", "ALICE", " ", "carol"]);
    let app = app_with_directory(directory.clone(), test_config());

    let req = authorized(json_request(
        "POST",
        "/api/admin/sessions",
        session_window(-1, 6),
    ));
    let (status, _, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);

    let session = &json(&body)["session"];
    assert!(session["id"].as_str().unwrap().starts_with("adm_session_"));
    assert_eq!(session["status"], "active");
    assert_eq!(session["is_ongoing"], true);
    assert_eq!(session["student_count"], 3);
    assert_eq!(session["validated_count"], 0);
    assert!(session["label"].as_str().unwrap().starts_with("ADM "));
    assert_eq!(directory.calls(), vec!["Bearer admin-token"]);

    // Visible through the other mount too
    let (status, _, body) = send(&app, request("GET", "/admin/sessions")).await;
    assert_eq!(status, StatusCode::OK);
    let sessions = json(&body)["sessions"].as_array().unwrap().clone();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["id"], session["id"]);
}

#[tokio::test]
async fn test_sessions_listed_newest_first() {
    let app = app_with_directory(MockDirectory::with_logins(&["alice"]), test_config());

    for (start, end) in [(1, 5), (10, 20)] {
        let req = authorized(json_request(
            "POST",
            "/admin/sessions",
            session_window(start, end),
        ));
        let (status, _, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json(&body)["session"]["status"], "draft");
    }

    let (_, _, body) = send(&app, request("GET", "/admin/sessions")).await;
    let sessions = json(&body)["sessions"].as_array().unwrap().clone();
    assert_eq!(sessions.len(), 2);
    assert!(sessions[0]["start_at"].as_str().unwrap() > sessions[1]["start_at"].as_str().unwrap());
}

#[tokio::test]
async fn test_create_validation_errors() {
    let app = app_with_directory(MockDirectory::with_logins(&["alice"]), test_config());

    let cases = vec![
        serde_json::json!({"label": "missing dates"}),
        session_window(5, 2),
        session_window(-10, -1),
    ];
    for body in cases {
        let req = authorized(json_request("POST", "/admin/sessions", body.clone()));
        let (status, _, response) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(json(&response)["error"], "invalid_request");
    }
}

#[tokio::test]
async fn test_create_requires_authorization() {
    let directory = MockDirectory::with_logins(&["alice"]);
    let app = app_with_directory(directory.clone(), test_config());

    let req = json_request("POST", "/admin/sessions", session_window(0, 3));
    let (status, _, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"], "unauthorized");
    assert!(directory.calls().is_empty());
}

#[tokio::test]
async fn test_create_without_directory() {
    let app = app(test_config());
    let req = authorized(json_request("POST", "/admin/sessions", session_window(0, 3)));
    let (status, _, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(&body)["error"], "directory_not_configured");
}

#[tokio::test]
async fn test_create_directory_failure_is_bad_gateway() {
    let app = app_with_directory(MockDirectory::failing(), test_config());
    let req = authorized(json_request("POST", "/admin/sessions", session_window(0, 3)));
    let (status, _, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json(&body)["error"], "directory_error");
}

#[tokio::test]
async fn test_create_falls_back_to_service_token() {
    let directory = MockDirectory::with_logins(&["alice"]);
    let state = adm_backend::AppState::in_memory()
        .with_directory(std::sync::Arc::new(directory.clone()))
        .with_service_token("Bearer service-token".to_string());
    let app = adm_backend::create_app(state, test_config()).unwrap();

    let req = json_request("POST", "/admin/sessions", session_window(0, 3));
    let (status, _, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(directory.calls(), vec!["Bearer service-token"]);
}
