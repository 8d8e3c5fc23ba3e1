//! Cross-origin resource sharing policy.
//!
//! Evaluated in front of route dispatch:
//!
//! 1. No `Origin` header: the request passes through untouched.
//! 2. Otherwise the origin is checked against the configured rule: a custom
//!    predicate (authoritative when set), the wildcard rule, or membership
//!    in the origin list after trailing-slash stripping and `localhost` /
//!    `127.0.0.1` loopback equivalence.
//! 3. Allowed origins are reflected verbatim in
//!    `Access-Control-Allow-Origin` (never `*`, even for the wildcard rule)
//!    together with the configured credentials/methods/headers/max-age.
//! 4. `OPTIONS` requests with an `Origin` are answered with `204 No Content`
//!    and never reach the routes. A denied preflight gets the 204 without
//!    any CORS headers.
//! 5. Denied non-preflight requests still run; the response just carries
//!    no CORS headers, so the browser refuses to expose it.
//!
//! Every response to a request with an `Origin` gets `Vary: Origin`, since
//! the headers above depend on it.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use http::header::{
    HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS,
    ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS, ORIGIN, VARY,
};
use http::{Method, StatusCode};
use tracing::debug;
use url::Url;

use crate::error::ConfigError;
use crate::router::{BoxFuture, Middleware, Next};

/// Custom origin check. Receives the raw `Origin` value and the request.
pub type OriginPredicate = Arc<dyn Fn(&str, &Request) -> bool + Send + Sync>;

/// Which origins may read responses.
#[derive(Clone)]
pub enum AllowedOrigins {
    /// Exact origins, compared after normalization.
    List(HashSet<String>),

    /// Any origin. The request origin is still reflected, never `*`.
    Any,

    /// A caller-supplied predicate; its verdict is final.
    Predicate(OriginPredicate),
}

impl fmt::Debug for AllowedOrigins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowedOrigins::List(origins) => f.debug_tuple("List").field(origins).finish(),
            AllowedOrigins::Any => write!(f, "Any"),
            AllowedOrigins::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Origin rule
    pub origins: AllowedOrigins,

    /// Send `Access-Control-Allow-Credentials: true`
    pub allow_credentials: bool,

    /// Methods advertised in `Access-Control-Allow-Methods`
    pub allow_methods: Vec<Method>,

    /// Headers advertised in `Access-Control-Allow-Headers`; empty means
    /// echo the request's `Access-Control-Request-Headers`
    pub allow_headers: Vec<String>,

    /// Headers listed in `Access-Control-Expose-Headers`
    pub expose_headers: Vec<String>,

    /// `Access-Control-Max-Age` in seconds; 0 omits the header
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: AllowedOrigins::List(HashSet::new()),
            allow_credentials: false,
            allow_methods: Vec::new(),
            allow_headers: Vec::new(),
            expose_headers: Vec::new(),
            max_age: 0,
        }
    }
}

impl CorsConfig {
    /// An empty configuration that allows no origins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow the given origins. A `*` entry switches to the wildcard rule.
    /// Entries are trimmed, stripped of trailing slashes, and empty entries
    /// are dropped.
    pub fn with_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = HashSet::new();
        for origin in origins {
            let origin = normalize_origin(origin.as_ref());
            if origin == "*" {
                self.origins = AllowedOrigins::Any;
                return self;
            }
            if !origin.is_empty() {
                set.insert(origin.to_string());
            }
        }
        self.origins = AllowedOrigins::List(set);
        self
    }

    /// Allow every origin.
    pub fn with_any_origin(mut self) -> Self {
        self.origins = AllowedOrigins::Any;
        self
    }

    /// Decide origins with a custom predicate.
    pub fn with_origin_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str, &Request) -> bool + Send + Sync + 'static,
    {
        self.origins = AllowedOrigins::Predicate(Arc::new(predicate));
        self
    }

    /// Enable or disable credentialed requests.
    pub fn with_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    /// Set the advertised methods.
    pub fn with_methods<I: IntoIterator<Item = Method>>(mut self, methods: I) -> Self {
        self.allow_methods = methods.into_iter().collect();
        self
    }

    /// Set the advertised request headers.
    pub fn with_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Set the exposed response headers.
    pub fn with_expose_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expose_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Set the preflight max-age in seconds.
    pub fn with_max_age(mut self, seconds: u64) -> Self {
        self.max_age = seconds;
        self
    }
}

/// The CORS middleware.
///
/// Header values are pre-rendered at construction, so evaluation never
/// fails at request time.
#[derive(Clone)]
pub struct CorsPolicy {
    inner: Arc<CorsInner>,
}

struct CorsInner {
    origins: AllowedOrigins,
    allow_credentials: bool,
    allow_methods: Option<HeaderValue>,
    allow_headers: Option<HeaderValue>,
    expose_headers: Option<HeaderValue>,
    max_age: Option<HeaderValue>,
}

impl CorsPolicy {
    /// Validate `config` and build the policy.
    pub fn new(config: CorsConfig) -> Result<Self, ConfigError> {
        let methods: Vec<String> = config
            .allow_methods
            .iter()
            .map(|m| m.as_str().to_string())
            .collect();

        let inner = CorsInner {
            allow_methods: join_header_value(&methods)?,
            allow_headers: join_header_value(&config.allow_headers)?,
            expose_headers: join_header_value(&config.expose_headers)?,
            max_age: (config.max_age > 0).then(|| HeaderValue::from(config.max_age)),
            allow_credentials: config.allow_credentials,
            origins: config.origins,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Whether `origin` may read responses for `request`.
    pub fn is_origin_allowed(&self, origin: &str, request: &Request) -> bool {
        self.inner.is_origin_allowed(origin, request)
    }
}

impl CorsInner {
    fn is_origin_allowed(&self, origin: &str, request: &Request) -> bool {
        match &self.origins {
            AllowedOrigins::Predicate(predicate) => predicate(origin, request),
            AllowedOrigins::Any => true,
            AllowedOrigins::List(allowed) => {
                let origin = normalize_origin(origin);
                allowed.contains(origin)
                    || loopback_alias(origin).is_some_and(|alias| allowed.contains(&alias))
            }
        }
    }

    /// Headers to add for an allowed `origin`.
    fn response_headers(
        &self,
        origin: &HeaderValue,
        request: &Request,
    ) -> Vec<(HeaderName, HeaderValue)> {
        let mut headers = vec![(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone())];

        if let Some(expose) = &self.expose_headers {
            headers.push((ACCESS_CONTROL_EXPOSE_HEADERS, expose.clone()));
        }
        if self.allow_credentials {
            headers.push((
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            ));
        }
        if let Some(methods) = &self.allow_methods {
            headers.push((ACCESS_CONTROL_ALLOW_METHODS, methods.clone()));
        }
        match &self.allow_headers {
            Some(allowed) => headers.push((ACCESS_CONTROL_ALLOW_HEADERS, allowed.clone())),
            None => {
                if let Some(requested) = request.headers().get(ACCESS_CONTROL_REQUEST_HEADERS) {
                    headers.push((ACCESS_CONTROL_ALLOW_HEADERS, requested.clone()));
                }
            }
        }
        if let Some(max_age) = &self.max_age {
            headers.push((ACCESS_CONTROL_MAX_AGE, max_age.clone()));
        }

        headers
    }

    async fn evaluate(&self, request: Request, next: Next) -> Response {
        let Some(origin) = request.headers().get(ORIGIN).cloned() else {
            return next.run(request).await;
        };

        let allowed = origin
            .to_str()
            .map(|value| self.is_origin_allowed(value, &request))
            .unwrap_or(false);

        let cors_headers = if allowed {
            self.response_headers(&origin, &request)
        } else {
            debug!(origin = ?origin, method = %request.method(), "Cross-origin request not allowed");
            Vec::new()
        };

        let mut response = if request.method() == Method::OPTIONS {
            StatusCode::NO_CONTENT.into_response()
        } else {
            next.run(request).await
        };

        let headers = response.headers_mut();
        for (name, value) in cors_headers {
            headers.insert(name, value);
        }
        headers.append(VARY, HeaderValue::from_static("Origin"));
        response
    }
}

impl Middleware for CorsPolicy {
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'static, Response> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { inner.evaluate(request, next).await })
    }
}

/// Trim whitespace and trailing slashes from an origin.
fn normalize_origin(origin: &str) -> &str {
    origin.trim().trim_end_matches('/')
}

/// The same origin with `localhost` and `127.0.0.1` swapped, if the host
/// is one of them.
fn loopback_alias(origin: &str) -> Option<String> {
    let url = Url::parse(origin).ok()?;
    let alias = match url.host_str()? {
        "localhost" => "127.0.0.1",
        "127.0.0.1" => "localhost",
        _ => return None,
    };
    let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();

    Some(format!("{}://{}{}", url.scheme(), alias, port))
}

/// Join unique, non-empty values with `", "`. Returns `None` when nothing
/// is left.
fn join_header_value(values: &[String]) -> Result<Option<HeaderValue>, ConfigError> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for value in values {
        let value = value.trim();
        if !value.is_empty() && seen.insert(value) {
            unique.push(value);
        }
    }

    if unique.is_empty() {
        return Ok(None);
    }

    let joined = unique.join(", ");
    HeaderValue::from_str(&joined)
        .map(Some)
        .map_err(|_| ConfigError::InvalidCorsValue {
            value: joined,
            reason: "not a valid header value",
        })
}
