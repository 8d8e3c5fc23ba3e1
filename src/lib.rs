//! # ADM Backend
//!
//! HTTP backend for ADM sessions, built around a small exact-match router.
//!
//! ## Features
//!
//! - **Exact-match routing**: static paths only, with 404 and 405 + `Allow`
//! - **Route groups**: nested prefixes inheriting a snapshot of the parent's middleware
//! - **Onion middleware**: first added is outermost
//! - **CORS policy**: reflected origins, loopback equivalence, 204 preflights
//! - **Base path**: optional prefix stripping in front of the router
//! - **Fault boundary**: panicking handlers become 500 responses
//!
//! ## Architecture
//!
//! - [`router`] - Path table, route groups, middleware chains and the dispatcher
//! - [`server`] - Front-door middleware, CORS, handlers and app assembly
//! - [`session`] - Session store and id generation
//! - [`directory`] - User directory client
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use adm_backend::{create_app, AppState, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RouterConfig::new()
//!         .with_cors_origins(vec!["http://localhost:8080".to_string()]);
//!     let app = create_app(AppState::in_memory(), config)?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod router;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use config::{Cli, Command, ServeConfig};
pub use directory::{DirectoryUser, HttpUserDirectory, UserDirectory};
pub use error::{ApiError, ConfigError, DirectoryError, RoutingError, StoreError};
pub use router::{
    from_fn, handler_fn, Handler, Middleware, MiddlewareChain, Next, RouteGroup, Router,
    RouterBuilder, RouterService,
};
pub use server::{
    build_routes, create_app, create_router, AppState, BasePathRewriter, CorsConfig, CorsPolicy,
    RouterConfig,
};
pub use session::{IdGenerator, InMemorySessionStore, SessionStore};
