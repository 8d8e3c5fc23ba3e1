//! Route groups: scoped prefixes with inherited middleware snapshots.

use std::sync::Arc;

use http::Method;
use tracing::debug;

use super::dispatch::Router;
use super::handler::{Handler, SharedHandler};
use super::middleware::{Middleware, MiddlewareChain};
use super::path::{invalid_path_reason, join_path, normalize_path};
use super::table::PathTable;
use crate::error::ConfigError;

/// State shared by every scope of one builder.
#[derive(Default)]
struct Registry {
    table: PathTable,
    fault: Option<ConfigError>,
}

impl Registry {
    fn record(&mut self, fault: ConfigError) {
        debug!(error = %fault, "Route configuration fault");
        if self.fault.is_none() {
            self.fault = Some(fault);
        }
    }
}

/// Assembles a [`Router`] during startup.
///
/// Configuration faults recorded while routes are declared are reported
/// by [`build`](Self::build), which fails on the first one.
#[derive(Default)]
pub struct RouterBuilder {
    registry: Registry,
    root: MiddlewareChain,
}

impl RouterBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the root scope.
    ///
    /// May be called several times; middleware added to the root in one
    /// call stays in effect for later calls.
    pub fn routes<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut RouteGroup<'_>),
    {
        let mut root = RouteGroup {
            prefix: "/".to_string(),
            chain: self.root.clone(),
            registry: &mut self.registry,
        };
        configure(&mut root);
        self.root = root.chain;
        self
    }

    /// Freeze the table into a [`Router`].
    pub fn build(self) -> Result<Router, ConfigError> {
        match self.registry.fault {
            Some(fault) => Err(fault),
            None => Ok(Router::from_table(self.registry.table)),
        }
    }
}

/// A routing scope: a path prefix plus a middleware chain.
///
/// Child scopes created with [`group`](Self::group) start from a copy of
/// this scope's chain, so later [`layer`](Self::layer) calls on either side
/// never leak into the other. All scopes of one builder register into the
/// same table.
pub struct RouteGroup<'a> {
    prefix: String,
    chain: MiddlewareChain,
    registry: &'a mut Registry,
}

impl<'a> RouteGroup<'a> {
    /// This scope's normalized prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Append a middleware to this scope's chain.
    pub fn layer<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.chain.push(middleware);
        self
    }

    /// Create a nested scope under `prefix` and configure it.
    pub fn group<F>(&mut self, prefix: &str, configure: F) -> &mut Self
    where
        F: FnOnce(&mut RouteGroup<'_>),
    {
        if let Some(reason) = invalid_path_reason(prefix) {
            self.registry.record(ConfigError::InvalidPath {
                path: prefix.to_string(),
                reason,
            });
            return self;
        }

        let mut child = RouteGroup {
            prefix: join_path(&self.prefix, prefix),
            chain: self.chain.clone(),
            registry: &mut *self.registry,
        };
        configure(&mut child);
        self
    }

    /// Register `handler` for `method` at `path` relative to this scope.
    pub fn route<H: Handler>(&mut self, method: Method, path: &str, handler: H) -> &mut Self {
        self.route_shared(method, path, Arc::new(handler))
    }

    /// Register an already shared handler. Mounting the same handler under
    /// several scopes produces independent routes that share only the
    /// terminal handler.
    pub fn route_shared(&mut self, method: Method, path: &str, handler: SharedHandler) -> &mut Self {
        if let Some(reason) = invalid_path_reason(path) {
            self.registry.record(ConfigError::InvalidPath {
                path: path.to_string(),
                reason,
            });
            return self;
        }

        let full_path = normalize_path(&join_path(&self.prefix, path));
        let composed = self.chain.compose(handler);
        self.registry.table.register(method, &full_path, composed);
        self
    }

    /// Register a handler for a method given by name.
    pub fn method<H: Handler>(&mut self, method: &str, path: &str, handler: H) -> &mut Self {
        match Method::from_bytes(method.as_bytes()) {
            Ok(method) => self.route(method, path, handler),
            Err(_) => {
                self.registry
                    .record(ConfigError::InvalidMethod(method.to_string()));
                self
            }
        }
    }

    /// Register a `GET` route.
    pub fn get<H: Handler>(&mut self, path: &str, handler: H) -> &mut Self {
        self.route(Method::GET, path, handler)
    }

    /// Register a `POST` route.
    pub fn post<H: Handler>(&mut self, path: &str, handler: H) -> &mut Self {
        self.route(Method::POST, path, handler)
    }

    /// Register a `PUT` route.
    pub fn put<H: Handler>(&mut self, path: &str, handler: H) -> &mut Self {
        self.route(Method::PUT, path, handler)
    }

    /// Register a `PATCH` route.
    pub fn patch<H: Handler>(&mut self, path: &str, handler: H) -> &mut Self {
        self.route(Method::PATCH, path, handler)
    }

    /// Register a `DELETE` route.
    pub fn delete<H: Handler>(&mut self, path: &str, handler: H) -> &mut Self {
        self.route(Method::DELETE, path, handler)
    }
}
