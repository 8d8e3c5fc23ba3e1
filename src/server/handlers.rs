//! Terminal handlers for the ADM API and the JSON error mapping.
//!
//! # Endpoints
//!
//! - `GET /healthz` - Health check
//! - `GET /student/sessions/current` - Current student session (placeholder)
//! - `POST /student/sessions/current/questionnaire` - Questionnaire (placeholder)
//! - `POST /student/sessions/current/submit` - Submit for validation (placeholder)
//! - `GET /admin/sessions` - List sessions
//! - `POST /admin/sessions` - Create a session and enrol every student

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::to_bytes,
    extract::Request,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::directory::{DirectoryUser, UserDirectory};
use crate::error::{ApiError, DirectoryError, RoutingError, StoreError};
use crate::session::{
    CreateSessionParams, IdGenerator, InMemorySessionStore, SessionStatus, SessionStore,
    SessionSummary,
};

/// Id prefix for ADM sessions.
pub const SESSION_ID_PREFIX: &str = "adm_session";

/// `created_by` value when the request carries no `X-User-Login`.
pub const UNKNOWN_ADMIN: &str = "unknown_admin";

/// Header naming the acting admin.
pub const USER_LOGIN_HEADER: &str = "x-user-login";

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

// =============================================================================
// Application State
// =============================================================================

/// Collaborators shared by the admin handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session storage
    pub sessions: Arc<dyn SessionStore>,

    /// User directory; `None` when no base URL is configured
    pub directory: Option<Arc<dyn UserDirectory>>,

    /// Fallback `Authorization` value for directory calls
    pub service_token: Option<String>,

    /// Id generator owned by this server instance
    pub ids: Arc<IdGenerator>,
}

impl AppState {
    /// Create state around an existing store and id generator.
    pub fn new(sessions: Arc<dyn SessionStore>, ids: Arc<IdGenerator>) -> Self {
        Self {
            sessions,
            directory: None,
            service_token: None,
            ids,
        }
    }

    /// State backed by a fresh [`InMemorySessionStore`].
    pub fn in_memory() -> Self {
        let ids = Arc::new(IdGenerator::new());
        let sessions = Arc::new(InMemorySessionStore::new(Arc::clone(&ids)));
        Self::new(sessions, ids)
    }

    /// Set the user directory.
    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Set the service token. Blank tokens are ignored.
    pub fn with_service_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.service_token = if token.trim().is_empty() {
            None
        } else {
            Some(token)
        };
        self
    }
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// JSON error body for handler errors and the fault-boundary 500.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "invalid_request", "internal_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create an error response carrying its status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Body of `POST /admin/sessions`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// Display label; blank means "ADM <year>"
    #[serde(default)]
    pub label: Option<String>,

    /// Opening time (RFC 3339)
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,

    /// Closing time (RFC 3339)
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
}

/// A session as seen by the admin frontend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub id: String,
    pub label: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub is_ongoing: bool,
    pub student_count: usize,
    pub validated_count: usize,
}

impl SessionView {
    /// Project a summary as of `now`.
    pub fn from_summary(summary: SessionSummary, now: DateTime<Utc>) -> Self {
        let is_ongoing = summary.start_at <= now && now <= summary.end_at;
        Self {
            id: summary.id,
            label: summary.label,
            start_at: summary.start_at,
            end_at: summary.end_at,
            status: summary.status,
            is_ongoing,
            student_count: summary.student_count,
            validated_count: summary.validated_count,
        }
    }
}

/// Response from `GET /admin/sessions`.
#[derive(Debug, Serialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<SessionView>,
}

/// Response from `POST /admin/sessions`.
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session: SessionView,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /healthz`
pub async fn health_handler(_request: Request) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// `GET /student/sessions/current`
pub async fn current_session_handler(_request: Request) -> Response {
    Json(serde_json::json!({
        "session": null,
        "message": "Student session endpoint placeholder",
    }))
    .into_response()
}

/// `POST /student/sessions/current/questionnaire`
pub async fn questionnaire_handler(_request: Request) -> Response {
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "message": "Questionnaire submission placeholder" })),
    )
        .into_response()
}

/// `POST /student/sessions/current/submit`
pub async fn submit_handler(_request: Request) -> Response {
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "message": "Submit for validation placeholder" })),
    )
        .into_response()
}

/// `GET /admin/sessions`
pub async fn list_sessions_handler(
    state: AppState,
    _request: Request,
) -> Result<Json<ListSessionsResponse>, ApiError> {
    let summaries = state.sessions.list_summaries().await?;

    let now = Utc::now();
    let sessions = summaries
        .into_iter()
        .map(|summary| SessionView::from_summary(summary, now))
        .collect();

    Ok(Json(ListSessionsResponse { sessions }))
}

/// `POST /admin/sessions`
///
/// Validates the window, pulls every student from the user directory and
/// stores the session together with one student session per login.
pub async fn create_session_handler(
    state: AppState,
    request: Request,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let directory = state
        .directory
        .clone()
        .ok_or(ApiError::DirectoryNotConfigured)?;

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| ApiError::InvalidRequest("failed to read request body".to_string()))?;
    let payload: CreateSessionRequest = serde_json::from_slice(&bytes)
        .map_err(|_| ApiError::InvalidRequest("invalid json body".to_string()))?;

    let (start_at, end_at) = match (payload.start_at, payload.end_at) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(ApiError::InvalidRequest(
                "start_at and end_at are required".to_string(),
            ))
        }
    };
    if end_at <= start_at {
        return Err(ApiError::InvalidRequest(
            "end_at must be after start_at".to_string(),
        ));
    }

    let now = Utc::now();
    if end_at < now {
        return Err(ApiError::InvalidRequest(
            "end_at cannot be in the past".to_string(),
        ));
    }

    let label = match payload.label.as_deref().map(str::trim) {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => default_label_for(start_at),
    };

    let authorization = header_str(&parts.headers, header::AUTHORIZATION.as_str())
        .map(str::to_string)
        .or_else(|| state.service_token.clone())
        .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".to_string()))?;

    let users = directory.list_all_users(&authorization).await?;
    let logins = dedupe_logins(&users);

    let (status, published_at) = if start_at <= now {
        (SessionStatus::Active, Some(now))
    } else {
        (SessionStatus::Draft, None)
    };

    let created_by = header_str(&parts.headers, USER_LOGIN_HEADER).unwrap_or(UNKNOWN_ADMIN);

    let session_id = state.ids.generate(SESSION_ID_PREFIX)?;
    let params = CreateSessionParams {
        id: session_id.clone(),
        label,
        start_at,
        end_at,
        status,
        created_by_login: created_by.to_string(),
        published_at,
    };

    state
        .sessions
        .insert_session_with_students(params, &logins)
        .await?;

    let created = state
        .sessions
        .list_summaries()
        .await?
        .into_iter()
        .find(|summary| summary.id == session_id)
        .ok_or_else(|| StoreError::Backend(format!("session {} not found", session_id)))?;

    info!(
        session_id = %session_id,
        students = logins.len(),
        created_by = %created_by,
        "Created session"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session: SessionView::from_summary(created, Utc::now()),
        }),
    ))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Trimmed, non-blank logins, de-duplicated case-insensitively (the last
/// spelling seen wins) and sorted.
fn dedupe_logins(users: &[DirectoryUser]) -> Vec<String> {
    let mut seen: HashMap<String, String> = HashMap::new();
    for user in users {
        let login = user.ft_login.trim();
        if login.is_empty() {
            continue;
        }
        seen.insert(login.to_lowercase(), login.to_string());
    }

    let mut logins: Vec<String> = seen.into_values().collect();
    logins.sort();
    logins
}

fn default_label_for(start: DateTime<Utc>) -> String {
    let year = match start.year() {
        year if year > 0 => year,
        _ => Utc::now().year(),
    };
    format!("ADM {}", year)
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert RoutingError to HTTP response.
///
/// 404 and 405 are expected traffic, logged at DEBUG and answered without a
/// body; the only header the router adds is `Allow` on a 405. Faults are
/// logged at ERROR and get a generic JSON 500.
impl IntoResponse for RoutingError {
    fn into_response(self) -> Response {
        match self {
            RoutingError::NotFound { .. } => {
                debug!(status = 404, "Routing error: {}", self);
                StatusCode::NOT_FOUND.into_response()
            }
            RoutingError::MethodNotAllowed { ref allowed, .. } => {
                debug!(status = 405, "Routing error: {}", self);
                let allow = allowed
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");

                let mut response = StatusCode::METHOD_NOT_ALLOWED.into_response();
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response.headers_mut().insert(header::ALLOW, value);
                }
                response
            }
            RoutingError::DownstreamFault { message } => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                // Fault details stay in the log
                error!(
                    error_type = "internal_error",
                    status = status.as_u16(),
                    "Server error: {}",
                    message
                );
                let body =
                    ErrorResponse::with_status("internal_error", "Internal server error", status);
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Convert ApiError to HTTP response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::DirectoryNotConfigured
            | ApiError::Directory(DirectoryError::NotConfigured) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "directory_not_configured",
            ),
            ApiError::Directory(_) => (StatusCode::BAD_GATEWAY, "directory_error"),
            ApiError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}
