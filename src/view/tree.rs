//! View node arena.
//!
//! # Responsibilities
//! - Hold containers, anchors, transition groups and route elements
//! - Parent/child links for closest-ancestor lookup and bubbling
//! - Evaluate every route element against a location path
//! - Collect route-change deliveries for ancestor listeners
//!
//! # Design Decisions
//! - Nodes are addressed by a stable `NodeId`; removed slots stay empty
//! - Evaluation never calls listeners; it returns deliveries so callers can
//!   release their lock first
//! - Pattern routes are evaluated before wildcards, in document order

use std::fmt;
use std::sync::Arc;

use crate::routing::{Activation, Display, RouteElement, RouteError, RouteMatch};

/// Stable identifier of a view node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Change notification fired when a route element becomes active.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteChange {
    /// The route element that activated.
    pub target: NodeId,
    /// The node whose listener is being invoked.
    pub current_target: NodeId,
    pub matched: RouteMatch,
}

pub type RouteChangeListener = Arc<dyn Fn(&RouteChange) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A listener invocation collected during evaluation.
pub struct Delivery {
    pub listener: RouteChangeListener,
    pub change: RouteChange,
}

impl Delivery {
    pub fn deliver(self) {
        (self.listener)(&self.change);
    }
}

#[derive(Debug)]
pub enum NodeKind {
    Container { name: String },
    /// A hyperlink; `href` is its destination, if any.
    Anchor { href: Option<String> },
    /// A named region for the animation primitive.
    TransitionGroup { name: Option<String>, default_name: String },
    Route(RouteElement),
}

struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
    listeners: Vec<(ListenerId, RouteChangeListener)>,
}

pub struct ViewTree {
    nodes: Vec<Option<Node>>,
    base_path: String,
    next_listener: u64,
    next_group: u64,
}

impl fmt::Debug for ViewTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewTree")
            .field("nodes", &self.nodes.iter().flatten().count())
            .field("base_path", &self.base_path)
            .finish()
    }
}

impl ViewTree {
    /// Create a tree holding a single root container.
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            nodes: vec![Some(Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Container { name: "root".into() },
                listeners: Vec::new(),
            })],
            base_path: base_path.into(),
            next_listener: 0,
            next_group: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn route(&self, id: NodeId) -> Option<&RouteElement> {
        match self.kind(id) {
            Some(NodeKind::Route(route)) => Some(route),
            _ => None,
        }
    }

    /// Visibility of a node. Only route elements can be removed from layout.
    pub fn display(&self, id: NodeId) -> Option<Display> {
        match self.kind(id)? {
            NodeKind::Route(route) => Some(route.display()),
            _ => Some(Display::Contents),
        }
    }

    pub fn append_container(&mut self, parent: NodeId, name: &str) -> Result<NodeId, RouteError> {
        self.append(parent, NodeKind::Container { name: name.to_string() })
    }

    pub fn append_anchor(&mut self, parent: NodeId, href: Option<&str>) -> Result<NodeId, RouteError> {
        self.append(parent, NodeKind::Anchor { href: href.map(str::to_string) })
    }

    /// Append a transition group. Unnamed groups get a unique `VT_<n>` name.
    pub fn append_transition_group(&mut self, parent: NodeId, name: Option<&str>) -> Result<NodeId, RouteError> {
        let default_name = format!("VT_{}", self.next_group);
        self.next_group += 1;
        self.append(
            parent,
            NodeKind::TransitionGroup {
                name: name.map(str::to_string),
                default_name,
            },
        )
    }

    /// Effective name of a transition group.
    pub fn transition_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::TransitionGroup { name: Some(name), .. } if !name.is_empty() => Some(name),
            NodeKind::TransitionGroup { default_name, .. } => Some(default_name),
            _ => None,
        }
    }

    /// Rename a transition group; `None` or `""` restores the default name.
    pub fn set_transition_name(&mut self, id: NodeId, name: Option<&str>) -> bool {
        match self.node_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::TransitionGroup { name: current, .. }) => {
                *current = name.map(str::to_string);
                true
            }
            _ => false,
        }
    }

    /// Mount a route element. Fails without mounting if the pattern does
    /// not compile.
    pub fn mount_route(&mut self, parent: NodeId, path: &str, exact: bool) -> Result<NodeId, RouteError> {
        if !self.contains(parent) {
            return Err(RouteError::UnknownNode(parent));
        }
        let (element, compiled) = RouteElement::new(path, exact, &self.base_path);
        compiled?;
        self.append(parent, NodeKind::Route(element))
    }

    /// Change a route element's attributes. On a compile error the element
    /// stays mounted but inactive.
    pub fn set_route_pattern(&mut self, id: NodeId, path: &str, exact: bool) -> Result<(), RouteError> {
        let base_path = self.base_path.clone();
        match self.node_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Route(route)) => {
                let compiled = route.set_pattern(path, exact, &base_path);
                if compiled.is_err() {
                    route.deactivate();
                }
                compiled
            }
            Some(_) => Err(RouteError::NotARoute(id)),
            None => Err(RouteError::UnknownNode(id)),
        }
    }

    /// Remove a node and its subtree. The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if id == self.root() || !self.contains(id) {
            return false;
        }
        if let Some(parent) = self.parent(id).and_then(|p| self.node_mut(p)) {
            parent.children.retain(|c| *c != id);
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(next.0).and_then(Option::take) {
                stack.extend(node.children);
            }
        }
        true
    }

    /// Nearest node (starting with `id` itself) satisfying `pred`.
    pub fn closest(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current)?;
            if pred(&node.kind) {
                return Some(current);
            }
            cursor = node.parent;
        }
        None
    }

    /// True if `id` is `ancestor` or lies below it.
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub fn add_route_listener(&mut self, id: NodeId, listener: RouteChangeListener) -> Result<ListenerId, RouteError> {
        self.next_listener += 1;
        let listener_id = ListenerId(self.next_listener);
        let node = self.node_mut(id).ok_or(RouteError::UnknownNode(id))?;
        node.listeners.push((listener_id, listener));
        Ok(listener_id)
    }

    pub fn remove_route_listener(&mut self, id: NodeId, listener: ListenerId) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                let before = node.listeners.len();
                node.listeners.retain(|(l, _)| *l != listener);
                node.listeners.len() != before
            }
            None => false,
        }
    }

    /// Route elements in document order.
    pub fn routes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            if matches!(node.kind, NodeKind::Route(_)) {
                out.push(id);
            }
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Re-evaluate every route element against `location_path`.
    ///
    /// Returns the listener invocations for routes that became active (or
    /// changed captures while active), ancestors after the target.
    pub fn evaluate_routes(&mut self, location_path: &str) -> Vec<Delivery> {
        let routes = self.routes();
        let (wildcards, patterns): (Vec<NodeId>, Vec<NodeId>) = routes
            .into_iter()
            .partition(|id| self.route(*id).is_some_and(RouteElement::is_wildcard));

        let mut deliveries = Vec::new();
        for id in patterns.into_iter().chain(wildcards) {
            let siblings_active = self.sibling_route_active(id);
            let activation = match self.node_mut(id).map(|n| &mut n.kind) {
                Some(NodeKind::Route(route)) => route.evaluate(location_path, siblings_active),
                _ => continue,
            };
            match activation {
                Activation::Activated(matched) => {
                    tracing::debug!(node = %id, path = %location_path, "Route activated");
                    self.collect_bubbling(id, matched, &mut deliveries);
                }
                Activation::Deactivated => {
                    tracing::debug!(node = %id, path = %location_path, "Route deactivated");
                }
                Activation::Unchanged => {}
            }
        }
        deliveries
    }

    fn sibling_route_active(&self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else { return false };
        self.children(parent)
            .iter()
            .filter(|c| **c != id)
            .any(|c| self.route(*c).is_some_and(RouteElement::is_active))
    }

    fn collect_bubbling(&self, target: NodeId, matched: RouteMatch, out: &mut Vec<Delivery>) {
        let mut cursor = Some(target);
        while let Some(current) = cursor {
            let Some(node) = self.node(current) else { break };
            for (_, listener) in &node.listeners {
                out.push(Delivery {
                    listener: listener.clone(),
                    change: RouteChange {
                        target,
                        current_target: current,
                        matched: matched.clone(),
                    },
                });
            }
            cursor = node.parent;
        }
    }

    fn append(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, RouteError> {
        let id = NodeId(self.nodes.len());
        let parent_node = self.node_mut(parent).ok_or(RouteError::UnknownNode(parent))?;
        parent_node.children.push(id);
        self.nodes.push(Some(Node {
            parent: Some(parent),
            children: Vec::new(),
            kind,
            listeners: Vec::new(),
        }));
        Ok(id)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }
}
