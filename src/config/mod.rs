//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, patterns compile)
//!     → AppConfig (validated, immutable)
//!     → shell builds document, route host, scheduler
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → sent over mpsc to the running shell
//!     → route patterns re-applied (matchers recompiled)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::AppConfig;
pub use schema::DocumentConfig;
pub use schema::ObservabilityConfig;
pub use schema::RouteConfig;
pub use schema::TransitionConfig;
