//! HTTP surface of the ADM backend.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Front door (outermost first)                                   │
//! │   Recover → RequestId → RealIp → AccessLog                      │
//! │     → BasePathRewriter (optional) → CorsPolicy                  │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Dispatcher (router) → per-route chain → terminal handler       │
//! │   /healthz, /student/..., /admin/sessions  (+ /api alias)       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod base_path;
pub mod cors;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use base_path::BasePathRewriter;
pub use cors::{AllowedOrigins, CorsConfig, CorsPolicy, OriginPredicate};
pub use handlers::{
    create_session_handler, current_session_handler, health_handler, list_sessions_handler,
    questionnaire_handler, submit_handler, AppState, CreateSessionRequest, CreateSessionResponse,
    ErrorResponse, HealthResponse, ListSessionsResponse, SessionView,
};
pub use middleware::{AccessLog, RealIp, Recover, RequestId, RequestIdValue};
pub use routes::{
    build_routes, create_app, create_router, default_cors_config, front_chain, mount, Handlers,
    RouterConfig,
};
