//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (nested routes reference earlier routes)
//! - Validate value ranges and that every pattern compiles
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::AppConfig;
use crate::navigation::document::base_path_of;
use crate::routing::RouteMatcher;

const MAX_ANIMATION_MS: u64 = 10_000;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidBaseUrl(String),
    InvalidMetricsAddress(String),
    AnimationTooLong(u64),
    EmptyRouteName,
    DuplicateRoute(String),
    UnknownParent { route: String, parent: String },
    InvalidPattern { route: String, reason: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidBaseUrl(url) => write!(f, "document.base_url `{}` is not a valid URL", url),
            ValidationError::InvalidMetricsAddress(addr) => {
                write!(f, "observability.metrics_address `{}` is not a socket address", addr)
            }
            ValidationError::AnimationTooLong(ms) => {
                write!(f, "transitions.animation_duration_ms {} exceeds {}", ms, MAX_ANIMATION_MS)
            }
            ValidationError::EmptyRouteName => write!(f, "route with empty name"),
            ValidationError::DuplicateRoute(name) => write!(f, "route `{}` defined twice", name),
            ValidationError::UnknownParent { route, parent } => {
                write!(f, "route `{}` nests in unknown or later route `{}`", route, parent)
            }
            ValidationError::InvalidPattern { route, reason } => {
                write!(f, "route `{}` has an invalid pattern: {}", route, reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let base_path = match Url::parse(&config.document.base_url) {
        Ok(url) => base_path_of(&url),
        Err(_) => {
            errors.push(ValidationError::InvalidBaseUrl(config.document.base_url.clone()));
            String::new()
        }
    };

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.transitions.animation_duration_ms > MAX_ANIMATION_MS {
        errors.push(ValidationError::AnimationTooLong(config.transitions.animation_duration_ms));
    }

    let mut seen = HashSet::new();
    for route in &config.routes {
        if route.name.is_empty() {
            errors.push(ValidationError::EmptyRouteName);
        } else if !seen.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }

        if let Some(parent) = &route.parent {
            // `seen` only holds earlier routes (and this one)
            if parent == &route.name || !seen.contains(parent.as_str()) {
                errors.push(ValidationError::UnknownParent {
                    route: route.name.clone(),
                    parent: parent.clone(),
                });
            }
        }

        if let Err(e) = RouteMatcher::compile(&route.path, route.exact, &base_path) {
            errors.push(ValidationError::InvalidPattern {
                route: route.name.clone(),
                reason: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
