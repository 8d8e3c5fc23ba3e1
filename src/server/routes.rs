//! Route table and front-door assembly for the ADM backend.
//!
//! # Route Structure
//!
//! ```text
//! /healthz                                    - Health check
//! /student/sessions/current                   - Current session (GET)
//! /student/sessions/current/questionnaire     - Questionnaire (POST)
//! /student/sessions/current/submit            - Submit for validation (POST)
//! /admin/sessions                             - List (GET) / create (POST)
//! /api/...                                    - The same tree again
//! ```
//!
//! # Example
//!
//! ```ignore
//! use adm_backend::server::{create_app, AppState, RouterConfig};
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://adm.example.com".to_string()])
//!     .with_base_path("/adm");
//!
//! let app = create_app(AppState::in_memory(), config)?;
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use http::{Method, StatusCode};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::base_path::BasePathRewriter;
use super::cors::{CorsConfig, CorsPolicy};
use super::handlers::{
    create_session_handler, current_session_handler, health_handler, list_sessions_handler,
    questionnaire_handler, submit_handler, AppState,
};
use super::middleware::{AccessLog, RealIp, Recover, RequestId};
use crate::error::ConfigError;
use crate::router::{handler_fn, MiddlewareChain, RouteGroup, Router, RouterService, SharedHandler};

/// Origins allowed when none are configured.
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:8080", "http://localhost:8081"];

/// Default preflight cache lifetime in seconds.
pub const DEFAULT_CORS_MAX_AGE: u64 = 300;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Prefix under which the whole route tree is mounted a second time.
pub const API_ALIAS_PREFIX: &str = "/api";

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP front door.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// CORS policy configuration
    pub cors: CorsConfig,

    /// Base path stripped before routing (None = serve at the root)
    pub base_path: Option<String>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Timeout applied to every request
    pub request_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a configuration with defaults:
    /// - CORS allows the local frontends with credentials
    /// - no base path
    /// - tracing enabled
    /// - 15 second request timeout
    pub fn new() -> Self {
        Self {
            cors: default_cors_config(&DEFAULT_CORS_ORIGINS),
            base_path: None,
            enable_tracing: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the allowed CORS origins. A `*` entry allows any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = self.cors.with_origins(origins);
        self
    }

    /// Replace the whole CORS configuration.
    pub fn with_cors(mut self, cors: CorsConfig) -> Self {
        self.cors = cors;
        self
    }

    /// Set the preflight max-age in seconds.
    pub fn with_cors_max_age(mut self, seconds: u64) -> Self {
        self.cors = self.cors.with_max_age(seconds);
        self
    }

    /// Serve under `base_path`.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// The CORS settings the ADM frontends expect, for `origins`.
pub fn default_cors_config<S: AsRef<str>>(origins: &[S]) -> CorsConfig {
    CorsConfig::new()
        .with_origins(origins)
        .with_credentials(true)
        .with_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .with_headers(["Accept", "Authorization", "Content-Type", "X-User-Login"])
        .with_expose_headers(["Link"])
        .with_max_age(DEFAULT_CORS_MAX_AGE)
}

// =============================================================================
// Route Table
// =============================================================================

/// The terminal handlers, shared by every mount.
#[derive(Clone)]
pub struct Handlers {
    pub health: SharedHandler,
    pub current_session: SharedHandler,
    pub questionnaire: SharedHandler,
    pub submit: SharedHandler,
    pub list_sessions: SharedHandler,
    pub create_session: SharedHandler,
}

impl Handlers {
    /// Bind the handlers to `state`.
    pub fn new(state: AppState) -> Self {
        let list_state = state.clone();
        let create_state = state;

        Self {
            health: Arc::new(handler_fn(health_handler)),
            current_session: Arc::new(handler_fn(current_session_handler)),
            questionnaire: Arc::new(handler_fn(questionnaire_handler)),
            submit: Arc::new(handler_fn(submit_handler)),
            list_sessions: Arc::new(handler_fn(move |req: Request| {
                list_sessions_handler(list_state.clone(), req)
            })),
            create_session: Arc::new(handler_fn(move |req: Request| {
                create_session_handler(create_state.clone(), req)
            })),
        }
    }
}

/// Register the route tree in `scope`.
pub fn mount(scope: &mut RouteGroup<'_>, handlers: &Handlers) {
    scope.route_shared(Method::GET, "/healthz", Arc::clone(&handlers.health));

    scope.group("/student", |student| {
        student.route_shared(
            Method::GET,
            "/sessions/current",
            Arc::clone(&handlers.current_session),
        );
        student.route_shared(
            Method::POST,
            "/sessions/current/questionnaire",
            Arc::clone(&handlers.questionnaire),
        );
        student.route_shared(
            Method::POST,
            "/sessions/current/submit",
            Arc::clone(&handlers.submit),
        );
    });

    scope.group("/admin", |admin| {
        admin.route_shared(Method::GET, "/sessions", Arc::clone(&handlers.list_sessions));
        admin.route_shared(Method::POST, "/sessions", Arc::clone(&handlers.create_session));
    });
}

/// Build the dispatcher: the route tree at the root and under `/api`.
pub fn build_routes(state: AppState) -> Result<Router, ConfigError> {
    let handlers = Handlers::new(state);

    Router::builder()
        .routes(|root| {
            mount(root, &handlers);
            root.group(API_ALIAS_PREFIX, |api| mount(api, &handlers));
        })
        .build()
}

// =============================================================================
// Router Builder
// =============================================================================

/// The front-door chain, outermost first: fault boundary, request id,
/// client address, access log, base path, CORS.
pub fn front_chain(config: &RouterConfig) -> Result<MiddlewareChain, ConfigError> {
    let mut chain = MiddlewareChain::new()
        .with(Recover)
        .with(RequestId::new())
        .with(RealIp)
        .with(AccessLog);

    if let Some(base_path) = config.base_path.as_deref() {
        let rewriter = BasePathRewriter::new(base_path)?;
        if rewriter.base().is_some() {
            chain.push(rewriter);
        }
    }

    chain.push(CorsPolicy::new(config.cors.clone())?);
    Ok(chain)
}

/// Create the composed service: front door plus dispatcher.
pub fn create_router(state: AppState, config: &RouterConfig) -> Result<RouterService, ConfigError> {
    let router = build_routes(state)?;
    let front = front_chain(config)?;
    Ok(router.into_service(front))
}

/// Create the axum application hosting the composed service, with the
/// request timeout and (optionally) request tracing.
pub fn create_app(state: AppState, config: RouterConfig) -> Result<axum::Router, ConfigError> {
    let service = create_router(state, &config)?;

    let app = axum::Router::new()
        .fallback_service(service)
        .layer(timeout_layer(config.request_timeout));

    if config.enable_tracing {
        Ok(app.layer(TraceLayer::new_for_http()))
    } else {
        Ok(app)
    }
}

/// Requests running longer than `timeout` are answered with `408`.
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

// =============================================================================
// Tests
// =============================================================================
