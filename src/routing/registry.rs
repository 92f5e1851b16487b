//! Record of every registered `(transport path, verb)` pair.
//!
//! # Responsibilities
//! - Accumulate verbs per transport path, duplicates included
//! - Report which methods exist for a concrete request path
//!
//! # Design Decisions
//! - Owned by one server instance, never process-global
//! - Diagnostic only: dispatch never reads it, the not-found stage does

use std::fmt;

use axum::http::Method;
use dashmap::DashMap;

use crate::routing::matcher::PathPattern;

/// Transport-level verb of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    /// Generic middleware.
    Use,
    /// File-serving mount.
    Static,
}

impl Verb {
    /// HTTP method answered by this verb, if it is a plain route.
    pub fn method(self) -> Option<Method> {
        match self {
            Verb::Get => Some(Method::GET),
            Verb::Post => Some(Method::POST),
            Verb::Put => Some(Method::PUT),
            Verb::Patch => Some(Method::PATCH),
            Verb::Delete => Some(Method::DELETE),
            Verb::Use | Verb::Static => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
            Verb::Use => "USE",
            Verb::Static => "STATIC",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct RegistryEntry {
    pattern: PathPattern,
    verbs: Vec<Verb>,
}

/// Per-server table of registered bindings.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    entries: DashMap<String, RegistryEntry>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, pattern: &PathPattern, verb: Verb) {
        let path = pattern.transport_path();
        tracing::debug!(verb = %verb, path = %path, "Route recorded");
        self.entries
            .entry(path)
            .or_insert_with(|| RegistryEntry {
                pattern: pattern.clone(),
                verbs: Vec::new(),
            })
            .verbs
            .push(verb);
    }

    /// Verbs recorded for a transport path, in registration order.
    pub fn verbs(&self, transport_path: &str) -> Vec<Verb> {
        self.entries
            .get(transport_path)
            .map(|entry| entry.verbs.clone())
            .unwrap_or_default()
    }

    /// Methods routed for a concrete request path, deduplicated and sorted.
    /// GET implies HEAD.
    pub fn allowed_methods(&self, request_path: &str) -> Vec<Method> {
        let mut verbs: Vec<Verb> = self
            .entries
            .iter()
            .filter(|entry| entry.pattern.match_exact(request_path).is_some())
            .flat_map(|entry| entry.verbs.clone())
            .filter(|verb| verb.method().is_some())
            .collect();
        verbs.sort();
        verbs.dedup();

        let mut methods = Vec::with_capacity(verbs.len() + 1);
        for verb in verbs {
            if let Some(method) = verb.method() {
                if method == Method::GET {
                    methods.push(Method::HEAD);
                }
                methods.push(method);
            }
        }
        methods
    }

    /// Snapshot of the table sorted by path.
    pub fn entries(&self) -> Vec<(String, Vec<Verb>)> {
        let mut entries: Vec<(String, Vec<Verb>)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.verbs.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::path::PathSegment;

    fn pattern(path: &str) -> PathPattern {
        PathPattern::new(path.split('/').map(PathSegment::parse).collect())
    }

    #[test]
    fn test_accumulates_duplicates() {
        let registry = RouteRegistry::new();
        registry.record(&pattern("people"), Verb::Post);
        registry.record(&pattern("people"), Verb::Get);
        registry.record(&pattern("people"), Verb::Post);

        assert_eq!(registry.verbs("/people"), vec![Verb::Post, Verb::Get, Verb::Post]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_allowed_methods_for_concrete_path() {
        let registry = RouteRegistry::new();
        registry.record(&pattern("people/$id"), Verb::Get);
        registry.record(&pattern("people/$id"), Verb::Delete);
        registry.record(&pattern("people"), Verb::Use);

        assert_eq!(
            registry.allowed_methods("/people/7"),
            vec![Method::HEAD, Method::GET, Method::DELETE]
        );
        assert!(registry.allowed_methods("/people").is_empty());
        assert!(registry.allowed_methods("/pets").is_empty());
    }

    #[test]
    fn test_entries_sorted() {
        let registry = RouteRegistry::new();
        registry.record(&pattern("pets"), Verb::Get);
        registry.record(&pattern("invoke"), Verb::Post);
        let paths: Vec<String> = registry.entries().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["/invoke", "/pets"]);
    }
}
