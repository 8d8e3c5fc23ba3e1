//! Base-path stripping front door.
//!
//! When the service is deployed behind a path prefix (e.g. `/adm`), the
//! rewriter removes that prefix before routing, so the route table only
//! ever sees internal paths. Requests outside the prefix are answered with
//! 404 and go no further.

use std::sync::Arc;

use axum::extract::{OriginalUri, Request};
use axum::response::{IntoResponse, Response};
use http::uri::{PathAndQuery, Uri};
use tracing::debug;

use crate::error::{ConfigError, RoutingError};
use crate::router::{normalize_path, BoxFuture, Middleware, Next};

/// Strips a configured base path from incoming request paths.
#[derive(Debug, Clone, Default)]
pub struct BasePathRewriter {
    base: Option<Arc<str>>,
}

impl BasePathRewriter {
    /// Create a rewriter for `base`.
    ///
    /// An empty base or `/` yields a pass-through rewriter.
    pub fn new(base: &str) -> Result<Self, ConfigError> {
        let trimmed = base.trim();

        if let Some(reason) = invalid_base_reason(trimmed) {
            return Err(ConfigError::InvalidBasePath {
                path: base.to_string(),
                reason,
            });
        }

        let normalized = normalize_path(trimmed);
        let base = (normalized != "/").then(|| Arc::from(normalized.as_str()));
        Ok(Self { base })
    }

    /// A rewriter that never changes anything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// The normalized base path, if one is configured.
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Compute the internal path for `path`.
    ///
    /// Returns `None` if `path` is outside the base path.
    pub fn rewrite(&self, path: &str) -> Option<String> {
        let Some(base) = self.base.as_deref() else {
            return Some(path.to_string());
        };

        let rest = path.strip_prefix(base)?;
        if rest.is_empty() {
            Some("/".to_string())
        } else if rest.starts_with('/') {
            Some(rest.to_string())
        } else {
            Some(format!("/{}", rest))
        }
    }
}

impl Middleware for BasePathRewriter {
    fn handle(&self, mut request: Request, next: Next) -> BoxFuture<'static, Response> {
        if self.base.is_none() {
            return Box::pin(next.run(request));
        }

        let path = request.uri().path().to_string();
        let rewritten = self
            .rewrite(&path)
            .and_then(|internal| with_path(request.uri(), &internal));

        let Some(uri) = rewritten else {
            debug!(path = %path, base = ?self.base, "Request outside base path");
            let error = RoutingError::NotFound { path };
            return Box::pin(async move { error.into_response() });
        };

        if request.extensions().get::<OriginalUri>().is_none() {
            let original = request.uri().clone();
            request.extensions_mut().insert(OriginalUri(original));
        }
        *request.uri_mut() = uri;

        Box::pin(next.run(request))
    }
}

/// `uri` with its path replaced, keeping the query string.
fn with_path(uri: &Uri, path: &str) -> Option<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

fn invalid_base_reason(base: &str) -> Option<&'static str> {
    if base.contains('?') {
        return Some("query strings are not allowed");
    }
    if base.contains('#') {
        return Some("fragments are not allowed");
    }
    if base.chars().any(char::is_whitespace) {
        return Some("whitespace is not allowed");
    }
    if base.contains("://") {
        return Some("expected a path, not a URL");
    }
    None
}
