//! Request dispatch and the tower adapter.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use http::Method;
use tower::Service;
use tracing::debug;

use super::group::RouterBuilder;
use super::handler::{BoxFuture, Handler, SharedHandler};
use super::middleware::MiddlewareChain;
use super::path::normalize_path;
use super::table::{PathTable, Resolution};
use crate::error::RoutingError;

/// The dispatcher: resolves requests against a frozen [`PathTable`].
///
/// Cheap to clone; the table is shared and never mutated after build.
#[derive(Clone)]
pub struct Router {
    table: Arc<PathTable>,
}

impl Router {
    /// Start building a router.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub(crate) fn from_table(table: PathTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// Look up `(method, path)` without invoking anything.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        self.table.resolve(method, path)
    }

    /// Every registered `(method, path)` pair, sorted by path then method.
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.table.routes()
    }

    /// Dispatch a request: invoke the bound handler exactly once, or
    /// synthesize a 404/405.
    pub fn dispatch(&self, request: Request) -> BoxFuture<'static, Response> {
        let method = request.method().clone();
        let path = normalize_path(request.uri().path());

        match self.table.resolve(&method, &path) {
            Resolution::Matched(handler) => handler.call(request),
            Resolution::MethodMismatch(allowed) => {
                debug!(method = %method, path = %path, "Method not allowed");
                let error = RoutingError::MethodNotAllowed {
                    method,
                    path,
                    allowed,
                };
                Box::pin(async move { error.into_response() })
            }
            Resolution::NotFound => {
                debug!(method = %method, path = %path, "No route");
                let error = RoutingError::NotFound { path };
                Box::pin(async move { error.into_response() })
            }
        }
    }

    /// Wrap the dispatcher in a front-door chain and expose it as a tower
    /// service.
    pub fn into_service(self, front: MiddlewareChain) -> RouterService {
        RouterService::new(front.compose(Arc::new(self)))
    }
}

impl Handler for Router {
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        self.dispatch(request)
    }
}

/// A composed handler exposed as a `tower::Service`.
///
/// Never fails at the service level; every outcome is a response.
#[derive(Clone)]
pub struct RouterService {
    handler: SharedHandler,
}

impl RouterService {
    /// Wrap any handler.
    pub fn new(handler: SharedHandler) -> Self {
        Self { handler }
    }
}

impl Service<Request> for RouterService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let fut = self.handler.call(request);
        Box::pin(async move { Ok(fut.await) })
    }
}
