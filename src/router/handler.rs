//! The terminal handler abstraction.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::Request;
use axum::response::{IntoResponse, Response};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A handler shared between the route table and every mount it appears in.
pub type SharedHandler = Arc<dyn Handler>;

/// Something that turns a request into a response.
///
/// Terminal handlers and middleware-wrapped handlers implement the same
/// trait, so a composed chain is itself just another `Handler`.
pub trait Handler: Send + Sync + 'static {
    /// Process one request.
    fn call(&self, request: Request) -> BoxFuture<'static, Response>;
}

/// Adapter that turns an async function into a [`Handler`].
///
/// Created with [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Wrap an async function as a [`Handler`].
///
/// ```
/// use adm_backend::router::handler_fn;
/// use axum::extract::Request;
///
/// let health = handler_fn(|_req: Request| async { "ok" });
/// # let _ = health;
/// ```
pub fn handler_fn<F, Fut, R>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    HandlerFn { f }
}

impl<F, Fut, R> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        let fut = (self.f)(request);
        Box::pin(async move { fut.await.into_response() })
    }
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        (**self).call(request)
    }
}
