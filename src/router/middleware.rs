//! Ordered middleware composition.
//!
//! A [`MiddlewareChain`] wraps a terminal handler "onion" style: the first
//! middleware added is outermost, so it sees the request first and the
//! response last.
//!
//! ```text
//!   request ──► A ──► B ──► C ──► handler
//!   response ◄── A ◄── B ◄── C ◄──┘
//! ```

use std::future::Future;
use std::sync::Arc;

use axum::extract::Request;
use axum::response::{IntoResponse, Response};

use super::handler::{BoxFuture, Handler, SharedHandler};

/// A shared middleware instance. Scopes copy these handles when they fork.
pub type SharedMiddleware = Arc<dyn Middleware>;

/// A behavior that wraps a handler while preserving its interface.
pub trait Middleware: Send + Sync + 'static {
    /// Handle `request`, calling `next` zero or one time.
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'static, Response>;
}

/// The remainder of the chain, as seen by a middleware.
#[derive(Clone)]
pub struct Next {
    inner: SharedHandler,
}

impl Next {
    pub(crate) fn new(inner: SharedHandler) -> Self {
        Self { inner }
    }

    /// Run the rest of the chain.
    pub async fn run(self, request: Request) -> Response {
        self.inner.call(request).await
    }
}

/// A handler with one middleware layer applied.
struct Wrapped {
    middleware: SharedMiddleware,
    next: SharedHandler,
}

impl Handler for Wrapped {
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        self.middleware
            .handle(request, Next::new(Arc::clone(&self.next)))
    }
}

/// An ordered list of middleware.
///
/// Cloning a chain produces an independent snapshot: pushing onto the clone
/// never affects the original and vice versa.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<SharedMiddleware>,
}

impl MiddlewareChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware; it becomes the innermost layer so far.
    pub fn push<M: Middleware>(&mut self, middleware: M) {
        self.layers.push(Arc::new(middleware));
    }

    /// Builder-style [`push`](Self::push).
    pub fn with<M: Middleware>(mut self, middleware: M) -> Self {
        self.push(middleware);
        self
    }

    /// Number of layers in the chain.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the chain has no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Wrap `terminal` with every layer, first-added outermost.
    pub fn compose(&self, terminal: SharedHandler) -> SharedHandler {
        self.layers.iter().rev().fold(terminal, |next, middleware| {
            Arc::new(Wrapped {
                middleware: Arc::clone(middleware),
                next,
            }) as SharedHandler
        })
    }
}

/// Adapter that turns an async function into a [`Middleware`].
///
/// Created with [`from_fn`].
#[derive(Clone)]
pub struct FromFn<F> {
    f: F,
}

/// Build a middleware from an async function taking the request and the
/// rest of the chain.
///
/// ```
/// use adm_backend::router::{from_fn, Next};
/// use axum::extract::Request;
///
/// let tagging = from_fn(|req: Request, next: Next| async move {
///     let mut response = next.run(req).await;
///     response.headers_mut().insert("x-tag", "1".parse().unwrap());
///     response
/// });
/// # let _ = tagging;
/// ```
pub fn from_fn<F, Fut, R>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    FromFn { f }
}

impl<F, Fut, R> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'static, Response> {
        let fut = (self.f)(request, next);
        Box::pin(async move { fut.await.into_response() })
    }
}
