//! Application shell: one document, one route host, one transition scheduler.
//!
//! # Responsibilities
//! - Build the view tree from `[[routes]]`: each outlet is a transition
//!   group under the root, nested routes mount inside their parent route
//! - Pre-empt `navigate` with a capture subscriber so the history push
//!   runs inside a transition callback
//! - Replay navigation steps (`/path`, `back`, `forward`)
//! - Re-apply route configuration on reload
//!
//! # Data Flow
//! ```text
//! Shell::navigate(path)
//!     → temporary anchor in the nav container → RouteHost::click
//!     → `navigate` (capture) → start_transition(push_state, "navigate")
//!     → callback: push_state → `history-changed` → routes re-evaluated
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use thiserror::Error;

use crate::config::{AppConfig, RouteConfig};
use crate::navigation::{Document, EventName, NavigationError, NavigationEvent, SubscribeOptions, SubscriptionId};
use crate::routing::{RouteError, RouteMatch};
use crate::transition::{CallbackError, Transition, TransitionScheduler};
use crate::view::{ClickOutcome, NodeId, RouteHost};

/// Transition type attached to link navigations.
pub const NAVIGATE_TRANSITION: &str = "navigate";
/// Transition type attached to history traversals.
pub const TRAVERSE_TRANSITION: &str = "traverse";

/// Errors raised while building or driving the shell.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("route `{route}` nests in unknown route `{parent}`")]
    UnknownParent { route: String, parent: String },

    #[error("unknown route `{0}`")]
    UnknownRoute(String),
}

/// One navigation step of a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Navigate(String),
    Back,
    Forward,
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "back" => Ok(Step::Back),
            "forward" => Ok(Step::Forward),
            path if !path.is_empty() => Ok(Step::Navigate(path.to_string())),
            _ => Err("empty navigation step".to_string()),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Navigate(path) => write!(f, "{}", path),
            Step::Back => write!(f, "back"),
            Step::Forward => write!(f, "forward"),
        }
    }
}

/// An active route as reported by [`Shell::active_routes`].
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRoute {
    pub name: String,
    pub matched: RouteMatch,
}

struct MountedRoute {
    node: NodeId,
    config: RouteConfig,
}

pub struct Shell {
    document: Document,
    host: RouteHost,
    scheduler: TransitionScheduler,
    nav: NodeId,
    outlets: Mutex<HashMap<String, NodeId>>,
    /// Routes in configuration order.
    routes: Mutex<Vec<(String, MountedRoute)>>,
    last_started: Arc<Mutex<Option<Transition>>>,
    navigate_subscription: SubscriptionId,
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shell")
            .field("document", &self.document)
            .field("scheduler", &self.scheduler)
            .field("routes", &lock(&self.routes).len())
            .finish()
    }
}

impl Shell {
    /// Build a shell from a validated configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ShellError> {
        let document = Document::new(&config.document.base_url)?;
        let scheduler = TransitionScheduler::from_config(&config.transitions);
        Self::with_parts(document, scheduler, config)
    }

    /// Build a shell around an existing document and scheduler.
    pub fn with_parts(
        document: Document,
        scheduler: TransitionScheduler,
        config: &AppConfig,
    ) -> Result<Self, ShellError> {
        let host = RouteHost::attach(document.clone());
        let nav = host.append_container(host.root(), "nav")?;
        if config.document.intercept_links {
            host.intercept_navigation(nav)?;
        }

        let last_started = Arc::new(Mutex::new(None));
        let navigate_subscription = {
            let scheduler = scheduler.clone();
            let doc = document.clone();
            let last = last_started.clone();
            document.bus().subscribe(EventName::Navigate, SubscribeOptions::capture(), move |dispatch| {
                let NavigationEvent::Navigate { resolved_path, .. } = dispatch.event() else {
                    return;
                };
                dispatch.stop_propagation();

                let doc = doc.clone();
                let path = resolved_path.clone();
                let transition = scheduler.start_transition(
                    move || async move { doc.push_state(Value::Null, &path).map_err(CallbackError::from) },
                    Some(NAVIGATE_TRANSITION),
                );
                *lock(&last) = Some(transition);
            })
        };

        let shell = Self {
            document,
            host,
            scheduler,
            nav,
            outlets: Mutex::new(HashMap::new()),
            routes: Mutex::new(Vec::new()),
            last_started,
            navigate_subscription,
        };
        shell.apply_routes(&config.routes)?;

        tracing::info!(
            base_path = %shell.document.base_path(),
            routes = config.routes.len(),
            intercept_links = config.document.intercept_links,
            "Shell ready"
        );
        Ok(shell)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn host(&self) -> &RouteHost {
        &self.host
    }

    pub fn scheduler(&self) -> &TransitionScheduler {
        &self.scheduler
    }

    /// Node of a configured route.
    pub fn route_node(&self, name: &str) -> Option<NodeId> {
        lock(&self.routes)
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, mounted)| mounted.node)
    }

    /// Node of an outlet's transition group.
    pub fn outlet_node(&self, outlet: &str) -> Option<NodeId> {
        lock(&self.outlets).get(outlet).copied()
    }

    /// Follow a link to `href` from the nav container.
    ///
    /// Returns the transition the history push joined, or `None` when links
    /// are not intercepted and the push happened directly. Must be called
    /// within a Tokio runtime.
    pub fn navigate(&self, href: &str) -> Result<Option<Transition>, ShellError> {
        let anchor = self.host.append_anchor(self.nav, Some(href))?;
        lock(&self.last_started).take();
        let outcome = self.host.click(anchor);
        self.host.with_tree(|tree| tree.remove(anchor));

        match outcome? {
            ClickOutcome::Intercepted { .. } => Ok(lock(&self.last_started).take()),
            ClickOutcome::Ignored => {
                let path = self.document.resolve_href(href)?;
                self.document.push_state(Value::Null, &path)?;
                Ok(None)
            }
        }
    }

    /// Step back through history inside a transition.
    pub fn back(&self) -> Transition {
        self.traverse(-1)
    }

    /// Step forward through history inside a transition.
    pub fn forward(&self) -> Transition {
        self.traverse(1)
    }

    /// Replay one step.
    pub fn replay(&self, step: &Step) -> Result<Option<Transition>, ShellError> {
        match step {
            Step::Navigate(href) => self.navigate(href),
            Step::Back => Ok(Some(self.back())),
            Step::Forward => Ok(Some(self.forward())),
        }
    }

    /// Active routes in configuration order.
    pub fn active_routes(&self) -> Vec<ActiveRoute> {
        lock(&self.routes)
            .iter()
            .filter_map(|(name, mounted)| {
                self.host.route_match(mounted.node).map(|matched| ActiveRoute {
                    name: name.clone(),
                    matched,
                })
            })
            .collect()
    }

    /// Bring the mounted routes in line with `routes`.
    ///
    /// Routes that kept their placement (outlet and parent) are updated in
    /// place, which recompiles their matcher only if the pattern changed.
    /// Moved routes are remounted, removed ones disconnected.
    pub fn apply_routes(&self, routes: &[RouteConfig]) -> Result<(), ShellError> {
        let mut mounted = std::mem::take(&mut *lock(&self.routes));

        mounted.retain(|(name, existing)| {
            let keep = routes
                .iter()
                .any(|r| &r.name == name && same_placement(r, &existing.config));
            if !keep {
                self.host.remove(existing.node);
                tracing::info!(route = %name, "Route removed");
            }
            keep
        });
        // Removing a parent takes its nested routes with it
        mounted.retain(|(_, existing)| self.host.with_tree(|tree| tree.contains(existing.node)));

        let mut next = Vec::with_capacity(routes.len());
        let mut result = Ok(());
        for route in routes {
            match self.place_route(route, &mut mounted, &next) {
                Ok(entry) => next.push((route.name.clone(), entry)),
                Err(e) => {
                    tracing::warn!(route = %route.name, error = %e, "Route not applied");
                    result = Err(e);
                }
            }
        }

        *lock(&self.routes) = next;
        result
    }

    fn place_route(
        &self,
        route: &RouteConfig,
        mounted: &mut Vec<(String, MountedRoute)>,
        placed: &[(String, MountedRoute)],
    ) -> Result<MountedRoute, ShellError> {
        if let Some(i) = mounted.iter().position(|(name, _)| name == &route.name) {
            let (_, existing) = mounted.remove(i);
            if existing.config.path != route.path || existing.config.exact != route.exact {
                self.host.set_route_pattern(existing.node, &route.path, route.exact)?;
                tracing::info!(route = %route.name, path = %route.path, "Route pattern updated");
            }
            return Ok(MountedRoute {
                node: existing.node,
                config: route.clone(),
            });
        }

        let parent = match &route.parent {
            Some(parent) => placed
                .iter()
                .find(|(name, _)| name == parent)
                .map(|(_, m)| m.node)
                .ok_or_else(|| ShellError::UnknownParent {
                    route: route.name.clone(),
                    parent: parent.clone(),
                })?,
            None => self.outlet(&route.outlet)?,
        };

        let node = self.host.mount_route(parent, &route.path, route.exact)?;
        let name = route.name.clone();
        self.host.on_route_change(node, move |change| {
            // nested activations bubble through here too
            if change.target != change.current_target {
                return;
            }
            tracing::info!(
                route = %name,
                node = %change.target,
                wildcard = change.matched.is_wildcard(),
                "Route activated"
            );
        })?;
        tracing::debug!(route = %route.name, node = %node, "Route mounted");

        Ok(MountedRoute {
            node,
            config: route.clone(),
        })
    }

    fn outlet(&self, name: &str) -> Result<NodeId, ShellError> {
        let mut outlets = lock(&self.outlets);
        if let Some(node) = outlets.get(name) {
            return Ok(*node);
        }
        let node = self.host.append_transition_group(self.host.root(), Some(name))?;
        outlets.insert(name.to_string(), node);
        Ok(node)
    }

    fn traverse(&self, delta: isize) -> Transition {
        let doc = self.document.clone();
        self.scheduler.start_transition(
            move || async move {
                if !doc.go(delta) {
                    tracing::debug!(delta, "Nothing to traverse to");
                }
                Ok(())
            },
            Some(TRAVERSE_TRANSITION),
        )
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        self.document.bus().unsubscribe(self.navigate_subscription);
    }
}

fn same_placement(a: &RouteConfig, b: &RouteConfig) -> bool {
    a.outlet == b.outlet && a.parent == b.parent
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
