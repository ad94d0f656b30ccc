//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Hosting document settings.
    pub document: DocumentConfig,

    /// Transition scheduler settings.
    pub transitions: TransitionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Route element definitions, in document order.
    pub routes: Vec<RouteConfig>,
}

/// Hosting document configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DocumentConfig {
    /// URL the document was loaded from. Its path up to the last `/` is the
    /// base path for absolute route patterns.
    pub base_url: String,

    /// Intercept link clicks and navigate in-page.
    pub intercept_links: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost/index.html".to_string(),
            intercept_links: true,
        }
    }
}

/// Transition scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Use the animation primitive. When false, batches settle
    /// `ready`/`finished` as soon as their callbacks are done.
    pub animations_enabled: bool,

    /// Length of the animated phase in milliseconds.
    pub animation_duration_ms: u64,

    /// Buffered started/ended notices per subscriber.
    pub notice_capacity: usize,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            animations_enabled: true,
            animation_duration_ms: 250,
            notice_capacity: 64,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// A route element.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteConfig {
    /// Route identifier for logging and reloads.
    pub name: String,

    /// Pattern; `*` is the fallback route.
    #[serde(default = "default_route_path")]
    pub path: String,

    /// Anchor the pattern at the end of the location.
    #[serde(default)]
    pub exact: bool,

    /// Outlet (transition group) holding the route. Ignored when `parent`
    /// is set.
    #[serde(default = "default_outlet")]
    pub outlet: String,

    /// Name of an earlier route to nest inside.
    #[serde(default)]
    pub parent: Option<String>,
}

fn default_route_path() -> String {
    "/".to_string()
}

fn default_outlet() -> String {
    "main".to_string()
}
