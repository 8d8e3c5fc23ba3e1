//! Exact-match route table.
//!
//! Maps `(method, normalized path)` to a composed handler and keeps, per
//! path, the set of methods that path supports so method mismatches can be
//! told apart from misses.

use std::collections::HashMap;

use http::Method;
use tracing::debug;

use super::handler::SharedHandler;
use super::path::normalize_path;

/// Result of looking up a request in the table.
pub enum Resolution<'a> {
    /// An exact `(method, path)` binding exists.
    Matched(&'a SharedHandler),

    /// The path is known, but not for this method. Carries the supported
    /// methods, sorted and de-duplicated.
    MethodMismatch(Vec<Method>),

    /// Nothing is registered at this path.
    NotFound,
}

/// The `(method, path) -> handler` mapping.
///
/// Built during startup and shared read-only afterwards.
#[derive(Default)]
pub struct PathTable {
    routes: HashMap<(Method, String), SharedHandler>,
    methods: HashMap<String, Vec<Method>>,
}

impl PathTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `(method, path)`.
    ///
    /// Re-registering the same key replaces the previous binding (last
    /// write wins).
    pub fn register(&mut self, method: Method, path: &str, handler: SharedHandler) {
        let path = normalize_path(path);

        let methods = self.methods.entry(path.clone()).or_default();
        if !methods.contains(&method) {
            methods.push(method.clone());
            methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        }

        if self.routes.insert((method.clone(), path.clone()), handler).is_some() {
            debug!(method = %method, path = %path, "Route re-registered, replacing previous handler");
        }
    }

    /// Look up a request.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let path = normalize_path(path);

        if let Some(handler) = self.routes.get(&(method.clone(), path.clone())) {
            return Resolution::Matched(handler);
        }

        match self.methods.get(&path) {
            Some(methods) if !methods.is_empty() => Resolution::MethodMismatch(methods.clone()),
            _ => Resolution::NotFound,
        }
    }

    /// Every registered `(method, path)` pair, sorted by path then method.
    pub fn routes(&self) -> Vec<(Method, String)> {
        let mut routes: Vec<(Method, String)> = self.routes.keys().cloned().collect();
        routes.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        routes
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
