//! Transition batch state machine.
//!
//! # States
//! - Idle: created, accepting callbacks, not yet run
//! - Running: coordinator draining callbacks (still accepting)
//! - Animating: queue sealed, waiting on the animation primitive
//! - Finished: `finished` settled (terminal)
//!
//! # State Transitions
//! ```text
//! Idle → Running:       run() / run_skipping_animation() (first call only)
//! Running → Animating:  queue found empty (or a callback failed) → seal
//! Animating → Finished: `finished` settles, resolved or rejected
//! ```
//!
//! # Design Decisions
//! - A single coordinator pops, awaits, and re-checks the queue, so
//!   callbacks appended mid-drain run in the same batch
//! - Sealing happens under the queue lock at the moment the queue is found
//!   empty: an append either lands before it (and runs) or fails with
//!   `InvalidState`, never silently dropped
//! - `is_ready()` reports the seal; the `ready` signal settles right after
//!   (immediately, or when the animator says so)

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::observability::metrics;
use crate::transition::animator::{Animation, Animator};
use crate::transition::signal::{Outcome, Signal};
use crate::transition::TransitionError;

/// Error returned by an update callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Result of an update callback.
pub type CallbackResult = Result<(), CallbackError>;

/// A queued update callback.
pub type UpdateCallback = Box<dyn FnOnce() -> BoxFuture<'static, CallbackResult> + Send>;

/// Box an async closure as an `UpdateCallback`.
pub fn update_callback<F, Fut>(f: F) -> UpdateCallback
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = CallbackResult> + Send + 'static,
{
    Box::new(move || f().boxed())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Idle,
    Running,
    Animating,
    Finished,
}

struct BatchState {
    phase: Phase,
    sealed: bool,
    queue: VecDeque<UpdateCallback>,
    animation: Option<Arc<dyn Animation>>,
}

struct TransitionInner {
    id: u64,
    transition_type: Option<String>,
    animator: Option<Arc<dyn Animator>>,
    state: Mutex<BatchState>,
    callbacks_done: Signal,
    ready: Signal,
    finished: Signal,
}

/// A batch of update callbacks animated as one transition.
#[derive(Clone)]
pub struct Transition {
    inner: Arc<TransitionInner>,
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("id", &self.inner.id)
            .field("phase", &self.phase())
            .field("transition_type", &self.inner.transition_type)
            .finish()
    }
}

impl Transition {
    /// Create an idle batch. Without an animator, `run` uses the
    /// synchronous fallback.
    pub fn new(id: u64, animator: Option<Arc<dyn Animator>>, transition_type: Option<String>) -> Self {
        let inner = Arc::new(TransitionInner {
            id,
            transition_type,
            animator,
            state: Mutex::new(BatchState {
                phase: Phase::Idle,
                sealed: false,
                queue: VecDeque::new(),
                animation: None,
            }),
            callbacks_done: Signal::new(),
            ready: Signal::new(),
            finished: Signal::new(),
        });

        let weak: Weak<TransitionInner> = Arc::downgrade(&inner);
        inner.finished.on_settle(move |outcome| {
            if let Some(inner) = weak.upgrade() {
                let batch = Transition { inner };
                batch.lock().phase = Phase::Finished;
                match outcome {
                    Ok(()) => tracing::debug!(transition = batch.id(), "Transition finished"),
                    Err(e) => {
                        metrics::record_transition_failed();
                        tracing::warn!(transition = batch.id(), error = %e, "Transition finished with error");
                    }
                }
            }
        });

        Self { inner }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn transition_type(&self) -> Option<&str> {
        self.inner.transition_type.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Draining callbacks or animating; false once finished.
    pub fn is_running(&self) -> bool {
        matches!(self.phase(), Phase::Running | Phase::Animating)
    }

    /// Sealed: no further callbacks may join.
    pub fn is_ready(&self) -> bool {
        self.lock().sealed
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.is_settled()
    }

    /// Settles when every callback has completed (or the first one failed).
    pub fn callbacks_done(&self) -> Signal {
        self.inner.callbacks_done.clone()
    }

    /// Settles when the animation is about to start.
    pub fn ready(&self) -> Signal {
        self.inner.ready.clone()
    }

    /// Settles when the animation has completed.
    pub fn finished(&self) -> Signal {
        self.inner.finished.clone()
    }

    /// Append an update callback.
    pub fn add_callback<F, Fut>(&self, f: F) -> Result<&Self, TransitionError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        self.try_enqueue(update_callback(f))
            .map(|_| self)
            .map_err(|_| TransitionError::InvalidState { id: self.id() })
    }

    /// Append a boxed callback, handing it back if the batch is sealed.
    pub(crate) fn try_enqueue(&self, callback: UpdateCallback) -> Result<(), UpdateCallback> {
        let mut state = self.lock();
        if state.sealed {
            return Err(callback);
        }
        state.queue.push_back(callback);
        tracing::trace!(transition = self.id(), queued = state.queue.len(), "Callback queued");
        Ok(())
    }

    /// Start the batch. Later calls are no-ops. Must be called within a
    /// Tokio runtime.
    pub fn run(&self) {
        self.start(false);
    }

    /// Start the batch without engaging the animator: `ready` and
    /// `finished` settle as soon as the callbacks are done.
    pub fn run_skipping_animation(&self) {
        self.start(true);
    }

    /// Jump to the end: skip the running animation, or start without one.
    /// Callbacks already queued still run to completion.
    pub fn skip_transition(&self) {
        let animation = self.lock().animation.clone();
        match animation {
            Some(animation) => {
                tracing::debug!(transition = self.id(), "Skipping animation");
                animation.skip_transition();
            }
            None => self.run_skipping_animation(),
        }
    }

    fn start(&self, skip_transition: bool) {
        let animator = match &self.inner.animator {
            Some(animator) if !skip_transition => Some(animator.clone()),
            _ => None,
        };

        let animation = {
            let mut state = self.lock();
            if state.phase != Phase::Idle {
                return;
            }
            state.phase = Phase::Running;
            tracing::debug!(
                transition = self.id(),
                queued = state.queue.len(),
                animated = animator.is_some(),
                "Transition running"
            );

            let coordinator = drain(self.inner.clone()).boxed();
            match animator {
                Some(animator) => {
                    let animation = animator.start(coordinator);
                    state.animation = Some(animation.clone());
                    Some(animation)
                }
                None => {
                    let batch = self.clone();
                    tokio::spawn(async move {
                        let outcome = coordinator.await;
                        batch.inner.ready.settle(outcome.clone());
                        batch.inner.finished.settle(outcome);
                    });
                    None
                }
            }
        };

        if let Some(animation) = animation {
            let ready = self.inner.ready.clone();
            animation.ready().on_settle(move |outcome| {
                ready.settle(outcome.clone());
            });
            let finished = self.inner.finished.clone();
            animation.finished().on_settle(move |outcome| {
                finished.settle(outcome.clone());
            });
        }
    }

    fn lock(&self) -> MutexGuard<'_, BatchState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Drain the queue FIFO: pop, await, re-check. Seals the queue and settles
/// `callbacks_done` when it runs dry or a callback fails.
async fn drain(inner: Arc<TransitionInner>) -> Outcome {
    let batch = Transition { inner };
    let mut executed = 0usize;

    let outcome = loop {
        let next = {
            let mut state = batch.lock();
            match state.queue.pop_front() {
                Some(callback) => callback,
                None => {
                    state.sealed = true;
                    state.phase = Phase::Animating;
                    break Ok(());
                }
            }
        };

        let result = next().await;
        executed += 1;
        metrics::record_callback_executed();

        if let Err(e) = result {
            let mut state = batch.lock();
            state.sealed = true;
            state.phase = Phase::Animating;
            let dropped = state.queue.len();
            state.queue.clear();
            tracing::warn!(
                transition = batch.id(),
                error = %e,
                dropped,
                "Update callback failed"
            );
            break Err(TransitionError::Callback(e.to_string()));
        }
    };

    tracing::debug!(transition = batch.id(), executed, ok = outcome.is_ok(), "Callbacks done");
    batch.inner.callbacks_done.settle(outcome.clone());
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::transition::animator::TimedAnimator;

    fn recorder() -> Arc<Mutex<Vec<u32>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn push(log: &Arc<Mutex<Vec<u32>>>, n: u32) -> impl FnOnce() -> BoxFuture<'static, CallbackResult> + Send + 'static {
        let log = log.clone();
        move || {
            async move {
                tokio::task::yield_now().await;
                log.lock().unwrap().push(n);
                Ok(())
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_fifo_with_late_append() {
        let log = recorder();
        let batch = Transition::new(1, None, None);
        batch
            .add_callback(push(&log, 1))
            .unwrap()
            .add_callback(push(&log, 2))
            .unwrap()
            .add_callback(push(&log, 3))
            .unwrap();
        assert!(!batch.is_running());
        batch.run();
        assert!(batch.is_running());
        batch.add_callback(push(&log, 4)).unwrap();

        assert_eq!(batch.finished().wait().await, Ok(()));
        assert!(!batch.is_running());
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3, 4]);
        assert!(batch.is_ready());
        assert!(batch.is_finished());
        assert_eq!(batch.phase(), Phase::Finished);
    }

    #[tokio::test]
    async fn test_append_after_ready_fails() {
        let batch = Transition::new(7, None, None);
        batch.run();
        batch.ready().wait().await.unwrap();

        let err = batch.add_callback(|| async { Ok(()) }).unwrap_err();
        assert_eq!(err, TransitionError::InvalidState { id: 7 });
    }

    #[tokio::test]
    async fn test_run_is_idempotent() {
        let log = recorder();
        let batch = Transition::new(1, None, None);
        batch.add_callback(push(&log, 1)).unwrap();
        batch.run();
        batch.run();
        batch.run_skipping_animation();
        batch.finished().wait().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_empty_batch_completes() {
        let batch = Transition::new(1, Some(Arc::new(TimedAnimator::new(Duration::from_millis(1)))), None);
        batch.run();
        assert_eq!(batch.callbacks_done().wait().await, Ok(()));
        assert_eq!(batch.finished().wait().await, Ok(()));
    }

    #[tokio::test]
    async fn test_failure_rejects_every_signal() {
        let log = recorder();
        let batch = Transition::new(1, Some(Arc::new(TimedAnimator::new(Duration::from_millis(1)))), None);
        batch
            .add_callback(push(&log, 1))
            .unwrap()
            .add_callback(|| async { Err::<(), CallbackError>("broken".into()) })
            .unwrap()
            .add_callback(push(&log, 3))
            .unwrap();
        batch.run();

        let expected = Err(TransitionError::Callback("broken".into()));
        assert_eq!(batch.callbacks_done().wait().await, expected);
        assert_eq!(batch.ready().wait().await, expected);
        assert_eq!(batch.finished().wait().await, expected);
        assert_eq!(*log.lock().unwrap(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_before_run_bypasses_animator() {
        let batch = Transition::new(1, Some(Arc::new(TimedAnimator::new(Duration::from_secs(60)))), None);
        batch.add_callback(|| async { Ok(()) }).unwrap();
        batch.skip_transition();

        let started = tokio::time::Instant::now();
        batch.finished().wait().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(60));
        assert!(batch.lock().animation.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_during_animation() {
        let batch = Transition::new(1, Some(Arc::new(TimedAnimator::new(Duration::from_secs(60)))), None);
        batch.add_callback(|| async { Ok(()) }).unwrap();
        batch.run();
        batch.ready().wait().await.unwrap();
        assert!(!batch.is_finished());

        let started = tokio::time::Instant::now();
        batch.skip_transition();
        batch.finished().wait().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(60));
    }
}
