use http::Method;
use thiserror::Error;

/// Faults detected while assembling the router, middleware or server
/// configuration. These are fatal to startup and never surface at request
/// time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Route path cannot be registered as an exact static path
    #[error("Invalid route path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// Method token is not a valid HTTP method
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// Base path for the rewriter is malformed
    #[error("Invalid base path '{path}': {reason}")]
    InvalidBasePath { path: String, reason: &'static str },

    /// CORS header or origin value cannot be encoded as a header value
    #[error("Invalid CORS value '{value}': {reason}")]
    InvalidCorsValue { value: String, reason: &'static str },

    /// Server configuration value is out of range
    #[error("Invalid server configuration: {0}")]
    InvalidServer(String),
}

/// Outcomes the routing core produces on its own, without a terminal handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoutingError {
    /// No route is registered for the path (404)
    #[error("No route for path: {path}")]
    NotFound { path: String },

    /// The path exists, but not for this method (405)
    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },

    /// A downstream handler failed while executing (500)
    #[error("Internal server error: {message}")]
    DownstreamFault { message: String },
}

/// Errors from the session store collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A session with the same identifier already exists
    #[error("Session already exists: {0}")]
    Duplicate(String),

    /// Identifier generation failed
    #[error("Failed to generate id: {0}")]
    IdGeneration(String),

    /// Backend-specific failure
    #[error("Store error: {0}")]
    Backend(String),
}

/// Errors from the user directory collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    /// No base URL configured for the directory API
    #[error("User directory base URL not configured")]
    NotConfigured,

    /// Endpoint URL could not be built
    #[error("Invalid directory URL: {0}")]
    InvalidUrl(String),

    /// Network or connection error
    #[error("Directory request failed: {0}")]
    Request(String),

    /// Directory answered with a non-success status
    #[error("Directory users request failed: {0}")]
    Status(String),

    /// Response body was not the expected JSON
    #[error("Failed to decode directory response: {0}")]
    Decode(String),
}

/// Failures of the admin API handlers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Malformed or semantically invalid request body (400)
    #[error("{0}")]
    InvalidRequest(String),

    /// No credentials to forward to the user directory (401)
    #[error("{0}")]
    Unauthorized(String),

    /// The user directory client is not configured (500)
    #[error("User directory not configured")]
    DirectoryNotConfigured,

    /// The user directory failed (502)
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The session store failed (500)
    #[error(transparent)]
    Store(#[from] StoreError),
}
