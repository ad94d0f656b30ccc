//! View subsystem: the node tree and the route host that keeps it in sync
//! with the document location.
//!
//! # Data Flow
//! ```text
//! RouteHost::attach(document)
//!     → subscribes to `history-changed` on the document's bus
//!
//! mount / set pattern / history-changed
//!     → tree.rs evaluate_routes(location path)   (under the tree lock)
//!     → deliveries run after the lock is released
//!
//! RouteHost::click(target)
//!     → inside an intercepted root? closest anchor with href?
//!     → publish `navigate` (default navigation suppressed)
//! ```

pub mod tree;

use std::sync::{Arc, Mutex, MutexGuard};

pub use tree::{Delivery, ListenerId, NodeId, NodeKind, RouteChange, RouteChangeListener, ViewTree};

use crate::navigation::{Document, EventName, NavigationError, NavigationEvent, SubscribeOptions, SubscriptionId};
use crate::observability::metrics;
use crate::routing::{Display, RouteError, RouteMatch};

/// Result of dispatching a click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Default navigation was suppressed and `navigate` published.
    Intercepted { resolved_path: String, anchor: NodeId },
    /// Not inside an intercepted root, or no anchor with a destination.
    Ignored,
}

struct HostInner {
    document: Document,
    tree: Mutex<ViewTree>,
    intercept_roots: Mutex<Vec<NodeId>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl Drop for HostInner {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.get_mut().ok().and_then(Option::take) {
            self.document.bus().unsubscribe(id);
        }
    }
}

/// Owns a view tree and re-evaluates its routes whenever history changes.
#[derive(Clone)]
pub struct RouteHost {
    inner: Arc<HostInner>,
}

impl std::fmt::Debug for RouteHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteHost")
            .field("document", &self.inner.document)
            .finish()
    }
}

impl RouteHost {
    /// Create a host bound to `document` and subscribe it to history changes.
    pub fn attach(document: Document) -> Self {
        let tree = ViewTree::new(document.base_path());
        let inner = Arc::new(HostInner {
            document: document.clone(),
            tree: Mutex::new(tree),
            intercept_roots: Mutex::new(Vec::new()),
            subscription: Mutex::new(None),
        });

        let weak = Arc::downgrade(&inner);
        let id = document.bus().subscribe(EventName::HistoryChanged, SubscribeOptions::default(), move |_| {
            if let Some(inner) = weak.upgrade() {
                RouteHost { inner }.refresh();
            }
        });
        *lock(&inner.subscription) = Some(id);

        Self { inner }
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    pub fn root(&self) -> NodeId {
        self.tree().root()
    }

    /// Read or modify the tree directly. Listeners are not run; call
    /// `refresh` afterwards if routes were touched.
    pub fn with_tree<R>(&self, f: impl FnOnce(&mut ViewTree) -> R) -> R {
        f(&mut self.tree())
    }

    pub fn append_container(&self, parent: NodeId, name: &str) -> Result<NodeId, RouteError> {
        self.tree().append_container(parent, name)
    }

    pub fn append_anchor(&self, parent: NodeId, href: Option<&str>) -> Result<NodeId, RouteError> {
        self.tree().append_anchor(parent, href)
    }

    pub fn append_transition_group(&self, parent: NodeId, name: Option<&str>) -> Result<NodeId, RouteError> {
        self.tree().append_transition_group(parent, name)
    }

    /// Mount a route element and evaluate it against the current location.
    pub fn mount_route(&self, parent: NodeId, path: &str, exact: bool) -> Result<NodeId, RouteError> {
        let id = self.tree().mount_route(parent, path, exact).map_err(|e| {
            tracing::warn!(error = %e, "Route element rejected");
            e
        })?;
        tracing::debug!(node = %id, path, exact, "Route element mounted");
        self.refresh();
        Ok(id)
    }

    /// Change a route's pattern attributes and re-evaluate.
    pub fn set_route_pattern(&self, id: NodeId, path: &str, exact: bool) -> Result<(), RouteError> {
        let result = self.tree().set_route_pattern(id, path, exact);
        if let Err(e) = &result {
            tracing::warn!(node = %id, error = %e, "Route pattern rejected");
        }
        self.refresh();
        result
    }

    /// Remove a node and its subtree (disconnects any routes in it).
    pub fn remove(&self, id: NodeId) -> bool {
        let removed = self.tree().remove(id);
        if removed {
            lock(&self.inner.intercept_roots).retain(|r| *r != id);
            self.refresh();
        }
        removed
    }

    pub fn on_route_change<F>(&self, node: NodeId, listener: F) -> Result<ListenerId, RouteError>
    where
        F: Fn(&RouteChange) + Send + Sync + 'static,
    {
        self.tree().add_route_listener(node, Arc::new(listener))
    }

    pub fn remove_route_listener(&self, node: NodeId, listener: ListenerId) -> bool {
        self.tree().remove_route_listener(node, listener)
    }

    pub fn is_active(&self, id: NodeId) -> bool {
        self.tree().route(id).is_some_and(|r| r.is_active())
    }

    pub fn route_match(&self, id: NodeId) -> Option<RouteMatch> {
        self.tree().route(id).and_then(|r| r.matches().cloned())
    }

    pub fn display(&self, id: NodeId) -> Option<Display> {
        self.tree().display(id)
    }

    /// Re-evaluate every route against the document location and notify
    /// listeners of activations.
    pub fn refresh(&self) {
        let location = self.inner.document.location_path();
        let deliveries = self.tree().evaluate_routes(&location);
        if !deliveries.is_empty() {
            metrics::record_route_changes(deliveries.len());
        }
        for delivery in deliveries {
            delivery.deliver();
        }
    }

    /// Intercept link clicks inside `root` and install the document's
    /// default navigation handler.
    pub fn intercept_navigation(&self, root: NodeId) -> Result<(), RouteError> {
        if !self.tree().contains(root) {
            return Err(RouteError::UnknownNode(root));
        }
        let mut roots = lock(&self.inner.intercept_roots);
        if !roots.contains(&root) {
            roots.push(root);
        }
        drop(roots);
        self.inner.document.install_default_navigation();
        tracing::debug!(root = %root, "Link interception enabled");
        Ok(())
    }

    /// Dispatch a click on `target`.
    pub fn click(&self, target: NodeId) -> Result<ClickOutcome, NavigationError> {
        let found = {
            let tree = self.tree();
            let roots = lock(&self.inner.intercept_roots);
            if !roots.iter().any(|r| tree.is_within(target, *r)) {
                return Ok(ClickOutcome::Ignored);
            }
            tree.closest(target, |k| matches!(k, NodeKind::Anchor { .. }))
                .and_then(|anchor| match tree.kind(anchor) {
                    Some(NodeKind::Anchor { href: Some(href) }) => Some((anchor, href.clone())),
                    _ => None,
                })
        };
        let Some((anchor, href)) = found else {
            return Ok(ClickOutcome::Ignored);
        };

        let resolved_path = self.inner.document.resolve_href(&href)?;
        tracing::debug!(anchor = %anchor, path = %resolved_path, "Link click intercepted");
        self.inner.document.bus().publish(NavigationEvent::Navigate {
            resolved_path: resolved_path.clone(),
            anchor: Some(anchor),
        });
        Ok(ClickOutcome::Intercepted { resolved_path, anchor })
    }

    fn tree(&self) -> MutexGuard<'_, ViewTree> {
        lock(&self.inner.tree)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
