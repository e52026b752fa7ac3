//! Path router for compiled bridge routes.
//!
//! Routes are stored in declaration order. Resolution performs a linear scan
//! with a segment matcher that supports whole-segment `{param}` captures.
//! When several templates match a path, the one with the most literal
//! segments wins; ties go to the route declared first.
//!
//! The linear scan is O(R × D) where R = number of routes and D = path depth,
//! which is entirely acceptable for bridge route tables and trivially
//! correct to verify.

use mqbridge_kernel::{normalize_pattern, HttpMethod, PathSegment};
use percent_encoding::percent_decode_str;
use std::collections::HashMap;

struct RouteEntry {
    method: HttpMethod,
    segments: Vec<PathSegment>,
    pattern: String,
    literals: usize,
    index: usize,
}

/// Outcome of resolving a request against the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteLookup {
    /// A route matched on both path and method.
    Matched {
        index: usize,
        path_params: HashMap<String, String>,
    },
    /// The path matched one or more routes, none with this method.
    MethodNotAllowed { allowed: Vec<HttpMethod> },
    NotFound,
}

#[derive(Default)]
pub struct TrieRouter {
    routes: Vec<RouteEntry>,
}

impl TrieRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Register a route template under a handler index.
    ///
    /// Two templates collide when they share a method and are equal once
    /// capture names are erased (`/a/{x}` and `/a/{y}`). On collision the
    /// normalized pattern is returned as the error.
    pub fn register(
        &mut self,
        method: HttpMethod,
        segments: Vec<PathSegment>,
        index: usize,
    ) -> Result<(), String> {
        let pattern = normalize_pattern(&segments);
        if self
            .routes
            .iter()
            .any(|r| r.method == method && r.pattern == pattern)
        {
            return Err(pattern);
        }
        let literals = segments
            .iter()
            .filter(|s| matches!(s, PathSegment::Literal(_)))
            .count();
        self.routes.push(RouteEntry {
            method,
            segments,
            pattern,
            literals,
            index,
        });
        Ok(())
    }

    /// Match a concrete path against a template.
    ///
    /// Returns the decoded captures when the template matches. A segment
    /// that decodes to something containing `/` (an encoded `%2F`) never
    /// matches, so a capture cannot add levels to a topic.
    fn match_path(segments: &[PathSegment], path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in segments.iter().zip(parts) {
            let decoded = percent_decode_str(part).decode_utf8_lossy();
            if decoded.contains('/') {
                return None;
            }
            match segment {
                PathSegment::Literal(literal) => {
                    if *literal != decoded {
                        return None;
                    }
                }
                PathSegment::Capture(name) => {
                    params.insert(name.clone(), decoded.into_owned());
                }
            }
        }
        Some(params)
    }

    /// Resolve a request method and path.
    pub fn resolve(&self, method: &str, path: &str) -> RouteLookup {
        let method = HttpMethod::from_str_ci(method);
        let mut best: Option<(&RouteEntry, HashMap<String, String>)> = None;
        let mut allowed = Vec::new();

        for route in &self.routes {
            let Some(params) = Self::match_path(&route.segments, path) else {
                continue;
            };
            if Some(route.method) != method {
                if !allowed.contains(&route.method) {
                    allowed.push(route.method);
                }
                continue;
            }
            if best
                .as_ref()
                .is_none_or(|(current, _)| route.literals > current.literals)
            {
                best = Some((route, params));
            }
        }

        match best {
            Some((route, path_params)) => RouteLookup::Matched {
                index: route.index,
                path_params,
            },
            None if !allowed.is_empty() => RouteLookup::MethodNotAllowed { allowed },
            None => RouteLookup::NotFound,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
