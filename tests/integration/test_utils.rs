//! Test utilities for integration tests.
//!
//! Provides a scripted user directory and helpers to build the application
//! and send requests through it.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use adm_backend::directory::{DirectoryUser, UserDirectory};
use adm_backend::error::DirectoryError;
use adm_backend::{create_app, AppState, RouterConfig};

// =============================================================================
// Mock User Directory
// =============================================================================

/// A directory returning a fixed population and recording the
/// `Authorization` values it was called with.
#[derive(Clone, Default)]
pub struct MockDirectory {
    logins: Vec<String>,
    fail: bool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockDirectory {
    pub fn with_logins(logins: &[&str]) -> Self {
        Self {
            logins: logins.iter().map(|l| l.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserDirectory for MockDirectory {
    async fn list_all_users(
        &self,
        authorization: &str,
    ) -> Result<Vec<DirectoryUser>, DirectoryError> {
        self.calls.lock().unwrap().push(authorization.to_string());
        if self.fail {
            return Err(DirectoryError::Status("503 Service Unavailable".to_string()));
        }

        Ok(self
            .logins
            .iter()
            .enumerate()
            .map(|(i, login)| DirectoryUser {
                id: format!("user-{}", i),
                ft_login: login.clone(),
            })
            .collect())
    }
}

// =============================================================================
// Application Helpers
// =============================================================================

/// Default test configuration: tracing off, default CORS.
pub fn test_config() -> RouterConfig {
    RouterConfig::new().with_tracing(false)
}

/// Build the app with in-memory state and `directory`.
pub fn app_with_directory(directory: MockDirectory, config: RouterConfig) -> axum::Router {
    let state = AppState::in_memory().with_directory(Arc::new(directory));
    create_app(state, config).unwrap()
}

/// Build the app with in-memory state and no directory.
pub fn app(config: RouterConfig) -> axum::Router {
    create_app(AppState::in_memory(), config).unwrap()
}

/// A bodiless request.
pub fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// A JSON request.
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send `request` and collect the response.
pub async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

/// Parse a response body as JSON.
pub fn json(body: &Bytes) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}
