//! Client-side view router: route matching, navigation events, and batched
//! view transitions.

pub mod config;
pub mod lifecycle;
pub mod navigation;
pub mod observability;
pub mod routing;
pub mod shell;
pub mod transition;
pub mod view;

pub use config::AppConfig;
pub use lifecycle::Shutdown;
pub use navigation::{Document, NavigationBus};
pub use routing::{RouteMatch, RouteMatcher};
pub use shell::{Shell, ShellError, Step};
pub use transition::{Transition, TransitionScheduler};
pub use view::RouteHost;
