//! Front-door middleware: fault boundary, request ids, client address and
//! access logging.

use std::any::Any;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request};
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;
use http::header::{HeaderName, HeaderValue};
use tracing::{error, info};

use crate::error::RoutingError;
use crate::router::{BoxFuture, Middleware, Next};

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Request header carrying the client address.
pub const REAL_IP_HEADER: HeaderName = HeaderName::from_static("x-real-ip");

// =============================================================================
// Fault Boundary
// =============================================================================

/// Converts a panicking downstream handler into a `500` response.
///
/// Must be the outermost layer: nothing below it can unwind past the chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recover;

impl Middleware for Recover {
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'static, Response> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        Box::pin(async move {
            match AssertUnwindSafe(next.run(request)).catch_unwind().await {
                Ok(response) => response,
                Err(panic) => {
                    error!(
                        method = %method,
                        path = %path,
                        "Handler fault: {}",
                        panic_message(panic.as_ref())
                    );
                    RoutingError::DownstreamFault {
                        message: "handler failed unexpectedly".to_string(),
                    }
                    .into_response()
                }
            }
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

// =============================================================================
// Request Id
// =============================================================================

/// The id assigned to the current request, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdValue(pub String);

/// Assigns `req-<base36 counter>` ids.
///
/// Each instance owns its counter; clones share it.
#[derive(Debug, Clone, Default)]
pub struct RequestId {
    counter: Arc<AtomicU64>,
}

impl RequestId {
    /// Create a generator starting at 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next id.
    pub fn next_id(&self) -> String {
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("req-{}", to_base36(id))
    }
}

impl Middleware for RequestId {
    fn handle(&self, mut request: Request, next: Next) -> BoxFuture<'static, Response> {
        let id = self.next_id();
        request.extensions_mut().insert(RequestIdValue(id.clone()));

        Box::pin(async move {
            let mut response = next.run(request).await;
            if let Ok(value) = HeaderValue::from_str(&id) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            response
        })
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let mut buf = Vec::with_capacity(13);
    loop {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}

// =============================================================================
// Real IP
// =============================================================================

/// Fills `X-Real-IP` from the peer address when the header is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealIp;

impl Middleware for RealIp {
    fn handle(&self, mut request: Request, next: Next) -> BoxFuture<'static, Response> {
        if !request.headers().contains_key(REAL_IP_HEADER) {
            let peer = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip());

            if let Some(ip) = peer {
                if let Ok(value) = HeaderValue::from_str(&ip.to_string()) {
                    request.headers_mut().insert(REAL_IP_HEADER, value);
                }
            }
        }

        Box::pin(next.run(request))
    }
}

// =============================================================================
// Access Log
// =============================================================================

/// Logs one line per request once the response has unwound.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLog;

impl Middleware for AccessLog {
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'static, Response> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let request_id = request
            .extensions()
            .get::<RequestIdValue>()
            .map(|id| id.0.clone())
            .unwrap_or_default();

        Box::pin(async move {
            let start = Instant::now();
            let response = next.run(request).await;
            info!(
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                request_id = %request_id,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "{} {} {:?}",
                method,
                path,
                start.elapsed()
            );
            response
        })
    }
}
