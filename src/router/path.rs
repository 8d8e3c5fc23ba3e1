//! Path normalization for the exact-match route table.
//!
//! A normalized path always starts with `/` and never ends with `/` unless
//! it is exactly `/`. Normalization is idempotent, so it is applied both
//! when routes are registered and when requests are dispatched.

use crate::error::ConfigError;

/// Normalize a request or route path.
///
/// ```
/// use adm_backend::router::normalize_path;
///
/// assert_eq!(normalize_path(""), "/");
/// assert_eq!(normalize_path("/foo/"), "/foo");
/// assert_eq!(normalize_path("foo"), "/foo");
/// ```
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }

    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Join a scope prefix with a child path.
///
/// Joining with `""` or `"/"` on either side yields the other side
/// unchanged (after normalization).
pub fn join_path(prefix: &str, path: &str) -> String {
    let prefix = normalize_path(prefix);
    let path = normalize_path(path);

    match (prefix.as_str(), path.as_str()) {
        ("/", _) => path,
        (_, "/") => prefix,
        _ => format!("{}{}", prefix, path),
    }
}

/// Check that a path can be stored as an exact static route.
///
/// Query strings, fragments, whitespace and dynamic-segment markers are
/// rejected: the table only matches literal paths.
pub fn validate_route_path(path: &str) -> Result<(), ConfigError> {
    if let Some(reason) = invalid_path_reason(path) {
        return Err(ConfigError::InvalidPath {
            path: path.to_string(),
            reason,
        });
    }
    Ok(())
}

/// Returns a description of why `path` is not a literal path, if it isn't.
pub(crate) fn invalid_path_reason(path: &str) -> Option<&'static str> {
    if path.contains('?') {
        return Some("query strings are not part of a route");
    }
    if path.contains('#') {
        return Some("fragments are not part of a route");
    }
    if path.chars().any(char::is_whitespace) {
        return Some("whitespace is not allowed");
    }
    if path.contains(['{', '}', '*']) {
        return Some("dynamic segments are not supported");
    }
    None
}
