//! Navigation subsystem.
//!
//! # Data Flow
//! ```text
//! Link click inside an intercepted root (view::RouteHost::click)
//!     → closest anchor with a destination
//!     → document.rs (resolve base path + path + query + fragment)
//!     → bus.rs publishes `navigate`
//!         → capture subscribers (may stop propagation)
//!         → default handler: document.push_state()
//!
//! document.push_state() / back() / forward()
//!     → history.rs (move cursor / append entry)
//!     → bus.rs publishes `history-changed`
//!         → route hosts re-evaluate their route elements
//! ```
//!
//! # Design Decisions
//! - One owned document (and bus) per app instead of process globals
//! - Capture-priority subscribers always run before normal ones
//! - History is in-memory; entries are document-relative URLs

pub mod bus;
pub mod document;
pub mod history;

pub use bus::{Delivery, Dispatch, EventName, NavigationBus, NavigationEvent, SubscribeOptions, SubscriptionId};
pub use document::{Document, NavigationError};
pub use history::{History, HistoryEntry};
