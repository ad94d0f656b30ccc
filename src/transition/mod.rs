//! Transition subsystem.
//!
//! # Data Flow
//! ```text
//! TransitionScheduler::start_transition(update, type)
//!     → orchestrator.rs picks current / next / fresh batch
//!     → batch.rs queues the update callback
//!
//! Batch::run()
//!     → coordinator drains callbacks FIFO (pop, await, re-check)
//!     → seal + settle `callbacks_done`
//!     → animator.rs (ready / finished) or synchronous fallback
//!     → `finished` → orchestrator promotes `next`
//! ```
//!
//! # Design Decisions
//! - Lifecycle signals are settle-once values with ordered continuations
//! - A failed callback rejects all three signals; it never hangs a batch
//! - Skipping bypasses the animated phase only; queued callbacks still run

pub mod animator;
pub mod batch;
pub mod orchestrator;
pub mod signal;

use thiserror::Error;

pub use animator::{Animation, Animator, TimedAnimator, UpdateFuture};
pub use batch::{update_callback, CallbackError, CallbackResult, Phase, Transition, UpdateCallback};
pub use orchestrator::{TransitionNotice, TransitionScheduler};
pub use signal::{Outcome, Signal};

/// Errors settled into transition signals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("transition {id} is ready; callbacks can no longer be added")]
    InvalidState { id: u64 },

    #[error("update callback failed: {0}")]
    Callback(String),

    #[error("transition signal dropped before settling")]
    Abandoned,
}
