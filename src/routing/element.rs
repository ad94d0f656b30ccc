//! Route element state.
//!
//! A route element owns its pattern attributes, the matcher compiled from
//! them, and the match it currently reports. Activation is derived from the
//! presence of a match.

use crate::routing::matcher::{RouteError, RouteMatch, RouteMatcher, WILDCARD};

/// Visibility of a view node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    /// Participates in layout.
    Contents,
    /// Removed from layout.
    None,
}

/// What changed when a route element was re-evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Became active, or stayed active with different captures.
    Activated(RouteMatch),
    Deactivated,
    Unchanged,
}

#[derive(Debug)]
pub struct RouteElement {
    path: String,
    exact: bool,
    matcher: Option<RouteMatcher>,
    current: Option<RouteMatch>,
}

impl RouteElement {
    /// Create an element and compile its pattern.
    ///
    /// On a compile error the element still exists but never matches.
    pub fn new(path: &str, exact: bool, base_path: &str) -> (Self, Result<(), RouteError>) {
        let mut element = Self {
            path: path.to_string(),
            exact,
            matcher: None,
            current: None,
        };
        let compiled = element.recompile(base_path);
        (element, compiled)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    pub fn is_wildcard(&self) -> bool {
        self.path == WILDCARD
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn matches(&self) -> Option<&RouteMatch> {
        self.current.as_ref()
    }

    pub fn display(&self) -> Display {
        if self.is_active() {
            Display::Contents
        } else {
            Display::None
        }
    }

    /// Replace the pattern attributes and recompile.
    pub fn set_pattern(&mut self, path: &str, exact: bool, base_path: &str) -> Result<(), RouteError> {
        self.path = path.to_string();
        self.exact = exact;
        self.recompile(base_path)
    }

    fn recompile(&mut self, base_path: &str) -> Result<(), RouteError> {
        match RouteMatcher::compile(&self.path, self.exact, base_path) {
            Ok(matcher) => {
                self.matcher = Some(matcher);
                Ok(())
            }
            Err(e) => {
                self.matcher = None;
                Err(e)
            }
        }
    }

    /// Evaluate against `location_path`.
    ///
    /// `siblings_active` only matters for the wildcard route.
    pub fn evaluate(&mut self, location_path: &str, siblings_active: bool) -> Activation {
        let next = match &self.matcher {
            Some(m) if m.is_wildcard() && siblings_active => None,
            Some(m) => m.matches(location_path),
            None => None,
        };
        self.apply(next)
    }

    /// Force the element inactive (e.g. after a failed recompile).
    pub fn deactivate(&mut self) -> Activation {
        self.apply(None)
    }

    fn apply(&mut self, next: Option<RouteMatch>) -> Activation {
        if next == self.current {
            return Activation::Unchanged;
        }
        self.current = next.clone();
        match next {
            Some(matched) => Activation::Activated(matched),
            None => Activation::Deactivated,
        }
    }
}
