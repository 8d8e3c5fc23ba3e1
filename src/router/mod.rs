//! Exact-match HTTP routing core.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      RouterBuilder                           │
//! │   RouteGroup("/")  ──group──►  RouteGroup("/admin") ...      │
//! │   (prefix + MiddlewareChain snapshot, shared PathTable)      │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ build()
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Router (dispatcher)                                         │
//! │   (method, normalized path) ─► composed handler | 405 | 404  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only literal paths are supported: there are no parameters, wildcards or
//! regex routes. The table is assembled once at startup and shared
//! read-only while serving.
//!
//! # Example
//!
//! ```
//! use adm_backend::router::{handler_fn, Router};
//! use axum::extract::Request;
//!
//! let router = Router::builder()
//!     .routes(|root| {
//!         root.get("/healthz", handler_fn(|_req: Request| async { "ok" }));
//!         root.group("/api", |api| {
//!             api.get("/healthz", handler_fn(|_req: Request| async { "ok" }));
//!         });
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(router.routes().len(), 2);
//! ```

mod dispatch;
mod group;
mod handler;
mod middleware;
mod path;
mod table;

pub use dispatch::{Router, RouterService};
pub use group::{RouteGroup, RouterBuilder};
pub use handler::{handler_fn, BoxFuture, Handler, HandlerFn, SharedHandler};
pub use middleware::{from_fn, FromFn, Middleware, MiddlewareChain, Next, SharedMiddleware};
pub use path::{join_path, normalize_path, validate_route_path};
pub use table::{PathTable, Resolution};
