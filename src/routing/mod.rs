//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route element mounted / attributes changed
//!     → matcher.rs (compile pattern against base path)
//!     → element.rs (store matcher, evaluate location)
//!
//! History changed (navigation bus):
//!     → view tree re-evaluates every route element
//!     → element.rs reports Activated / Deactivated / Unchanged
//!     → activations bubble a RouteChange to ancestor listeners
//! ```
//!
//! # Design Decisions
//! - Matching is case-insensitive, anchored at the start
//! - Exact routes are also anchored at the end
//! - `*` is a fallback: active only while no sibling route is
//! - A bad pattern disables its own element, never its siblings

pub mod element;
pub mod matcher;

pub use element::{Activation, Display, RouteElement};
pub use matcher::{Captures, RouteError, RouteMatch, RouteMatcher, WILDCARD};
