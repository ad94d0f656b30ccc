//! The platform animation primitive.
//!
//! An `Animator` takes an update future, runs it, and exposes a `ready`
//! signal (safe to snapshot: the update is done) and a `finished` signal
//! (animation complete). `skip_transition` force-settles `finished` as soon
//! as the update is done. When no animator is configured, batches fall back
//! to running their update and settling both signals immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::Notify;

use crate::transition::signal::{Outcome, Signal};

/// Update function handed to an animator.
pub type UpdateFuture = BoxFuture<'static, Outcome>;

/// Starts animations.
pub trait Animator: Send + Sync {
    /// Begin an animation around `update`. Must not poll `update`
    /// synchronously.
    fn start(&self, update: UpdateFuture) -> Arc<dyn Animation>;
}

/// Handle to an animation in progress.
pub trait Animation: Send + Sync {
    fn ready(&self) -> Signal;
    fn finished(&self) -> Signal;
    fn skip_transition(&self);
}

/// Animator that holds the animated phase for a fixed duration.
#[derive(Debug, Clone)]
pub struct TimedAnimator {
    duration: Duration,
}

impl TimedAnimator {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

struct TimedAnimation {
    ready: Signal,
    finished: Signal,
    skipped: AtomicBool,
    skip: Notify,
}

impl Animator for TimedAnimator {
    fn start(&self, update: UpdateFuture) -> Arc<dyn Animation> {
        let animation = Arc::new(TimedAnimation {
            ready: Signal::new(),
            finished: Signal::new(),
            skipped: AtomicBool::new(false),
            skip: Notify::new(),
        });

        let duration = self.duration;
        let task = animation.clone();
        tokio::spawn(async move {
            let outcome = update.await;
            task.ready.settle(outcome.clone());
            if outcome.is_err() {
                task.finished.settle(outcome);
                return;
            }

            if !task.skipped.load(Ordering::Acquire) {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {}
                    _ = task.skip.notified() => {
                        tracing::debug!("Animation skipped");
                    }
                }
            }
            task.finished.settle(Ok(()));
        });

        animation
    }
}

impl Animation for TimedAnimation {
    fn ready(&self) -> Signal {
        self.ready.clone()
    }

    fn finished(&self) -> Signal {
        self.finished.clone()
    }

    fn skip_transition(&self) {
        self.skipped.store(true, Ordering::Release);
        self.skip.notify_one();
    }
}
