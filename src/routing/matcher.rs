//! Route pattern compilation and matching.
//!
//! # Responsibilities
//! - Compile a route pattern against the document's base path
//! - Match the current location path (case-insensitive)
//! - Extract ordered and named captures
//!
//! # Design Decisions
//! - Absolute patterns (leading `/`) are prefixed with the escaped base path
//! - The user pattern is wrapped in one capturing group, always anchored at
//!   the start and anchored at the end only for exact routes
//! - `*` never compiles a regex; whether it applies depends on its siblings,
//!   which the view tree decides

use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::view::NodeId;

/// The literal pattern of a fallback route.
pub const WILDCARD: &str = "*";

/// Errors raised while compiling or mounting routes.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("view node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("view node {0} is not a route")]
    NotARoute(NodeId),
}

/// Captures of a successful pattern match.
///
/// `groups[0]` is the whole match, `groups[1]` the portion matched by the
/// route pattern itself (without base path), the rest are the pattern's own
/// groups in order. Groups that did not participate are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captures {
    pub groups: Vec<Option<String>>,
    pub named: BTreeMap<String, String>,
}

impl Captures {
    /// Look up a named group.
    pub fn name(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Look up a group by position.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }
}

/// Result of matching a route against a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch {
    Pattern(Captures),
    /// Fallback route: carries the raw location path.
    Wildcard { path: String },
}

impl RouteMatch {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, RouteMatch::Wildcard { .. })
    }

    /// Named capture, if any. Wildcard matches have none.
    pub fn param(&self, name: &str) -> Option<&str> {
        match self {
            RouteMatch::Pattern(captures) => captures.name(name),
            RouteMatch::Wildcard { .. } => None,
        }
    }
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    pattern: String,
    exact: bool,
    regex: Option<Regex>,
}

impl RouteMatcher {
    /// Compile `pattern` against `base_path`.
    pub fn compile(pattern: &str, exact: bool, base_path: &str) -> Result<Self, RouteError> {
        if pattern == WILDCARD {
            return Ok(Self {
                pattern: pattern.to_string(),
                exact,
                regex: None,
            });
        }

        let prefix = if pattern.starts_with('/') {
            regex::escape(base_path)
        } else {
            String::new()
        };
        let anchor_end = if exact { "$" } else { "" };
        let source = format!("^{}({}){}", prefix, pattern, anchor_end);

        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|source| RouteError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;

        Ok(Self {
            pattern: pattern.to_string(),
            exact,
            regex: Some(regex),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    pub fn is_wildcard(&self) -> bool {
        self.regex.is_none()
    }

    /// Match a location path.
    ///
    /// A wildcard matcher always yields the sentinel; callers must check
    /// sibling activity first.
    pub fn matches(&self, location_path: &str) -> Option<RouteMatch> {
        let Some(regex) = &self.regex else {
            return Some(RouteMatch::Wildcard {
                path: location_path.to_string(),
            });
        };

        let caps = regex.captures(location_path)?;
        let groups = caps
            .iter()
            .map(|g| g.map(|m| m.as_str().to_string()))
            .collect();
        let named = regex
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
            .collect();

        Some(RouteMatch::Pattern(Captures { groups, named }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_index_pattern() {
        let matcher = RouteMatcher::compile("/(?:index.html)?", true, "").unwrap();
        assert!(matcher.matches("/").is_some());
        assert!(matcher.matches("/index.html").is_some());
        assert!(matcher.matches("/index.html/extra").is_none());

        let loose = RouteMatcher::compile("/(?:index.html)?", false, "").unwrap();
        assert!(loose.matches("/index.html/extra").is_some());
    }

    #[test]
    fn test_case_insensitive() {
        let matcher = RouteMatcher::compile("/video", false, "").unwrap();
        assert!(matcher.matches("/VIDEO/12").is_some());
        assert!(matcher.matches("/videos").is_some());
        assert!(matcher.matches("/about").is_none());
    }

    #[test]
    fn test_base_path_prefix() {
        let matcher = RouteMatcher::compile("/video", true, "/app").unwrap();
        assert!(matcher.matches("/app/video").is_some());
        assert!(matcher.matches("/video").is_none());

        // Relative patterns ignore the base path
        let relative = RouteMatcher::compile("app/x", false, "/ignored").unwrap();
        assert!(relative.matches("app/x").is_some());
    }

    #[test]
    fn test_base_path_is_literal() {
        let matcher = RouteMatcher::compile("/", false, "/a.b").unwrap();
        assert!(matcher.matches("/a.b/").is_some());
        assert!(matcher.matches("/aXb/").is_none());
    }

    #[test]
    fn test_captures() {
        let matcher = RouteMatcher::compile(r"/video/(?<id>\w+)/(\d+)?", false, "/app").unwrap();
        let Some(RouteMatch::Pattern(caps)) = matcher.matches("/app/video/abc/") else {
            panic!("expected a pattern match");
        };
        assert_eq!(caps.get(0), Some("/app/video/abc/"));
        assert_eq!(caps.get(1), Some("/video/abc/"));
        assert_eq!(caps.get(2), Some("abc"));
        assert_eq!(caps.get(3), None);
        assert_eq!(caps.name("id"), Some("abc"));
    }

    #[test]
    fn test_wildcard_sentinel() {
        let matcher = RouteMatcher::compile(WILDCARD, false, "/app").unwrap();
        assert!(matcher.is_wildcard());
        assert_eq!(
            matcher.matches("/app/nowhere"),
            Some(RouteMatch::Wildcard { path: "/app/nowhere".into() })
        );
    }

    #[test]
    fn test_invalid_pattern() {
        let err = RouteMatcher::compile("/video/(", false, "").unwrap_err();
        assert!(matches!(err, RouteError::InvalidPattern { .. }));
    }
}
