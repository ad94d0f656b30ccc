//! `start_transition`: fold, queue, or start.
//!
//! # Decision Table
//! ```text
//! current = None                → new batch, add callback, run it
//! current not ready (unsealed)  → add callback to current
//! current ready (sealed)        → add callback to next (created on demand)
//!
//! current.finished settles      → next? promote, run, watch it
//!                                 none? current = None
//! ```
//!
//! # Design Decisions
//! - At most two live batches; only `current` is ever running
//! - `next` is only created once `current` is sealed, so it is never run
//!   while another batch animates (unless skipped, which runs it at once;
//!   later updates then queue behind a fresh `next`)
//! - The transition-type tag is passed through to notices untouched

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::TransitionConfig;
use crate::observability::metrics;
use crate::transition::animator::{Animator, TimedAnimator};
use crate::transition::batch::{update_callback, CallbackResult, Transition};
use crate::transition::signal::Outcome;

/// Notices for external observers of a `start_transition` call.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionNotice {
    Started {
        transition: u64,
        transition_type: Option<String>,
    },
    Ended {
        transition: u64,
        transition_type: Option<String>,
        outcome: Outcome,
    },
}

#[derive(Default)]
struct ProcessState {
    current: Option<Transition>,
    next: Option<Transition>,
}

struct SchedulerInner {
    animator: Option<Arc<dyn Animator>>,
    next_id: AtomicU64,
    state: Mutex<ProcessState>,
    notices: broadcast::Sender<TransitionNotice>,
}

/// Owns the `current`/`next` batches. Clone to share.
#[derive(Clone)]
pub struct TransitionScheduler {
    inner: Arc<SchedulerInner>,
}

impl std::fmt::Debug for TransitionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("TransitionScheduler")
            .field("animated", &self.inner.animator.is_some())
            .field("current", &state.current.as_ref().map(Transition::id))
            .field("next", &state.next.as_ref().map(Transition::id))
            .finish()
    }
}

impl TransitionScheduler {
    /// Create a scheduler. `None` selects the synchronous fallback.
    pub fn new(animator: Option<Arc<dyn Animator>>, notice_capacity: usize) -> Self {
        let (notices, _) = broadcast::channel(notice_capacity.max(1));
        Self {
            inner: Arc::new(SchedulerInner {
                animator,
                next_id: AtomicU64::new(1),
                state: Mutex::new(ProcessState::default()),
                notices,
            }),
        }
    }

    pub fn from_config(config: &TransitionConfig) -> Self {
        let animator: Option<Arc<dyn Animator>> = if config.animations_enabled {
            Some(Arc::new(TimedAnimator::new(Duration::from_millis(config.animation_duration_ms))))
        } else {
            None
        };
        Self::new(animator, config.notice_capacity)
    }

    /// Subscribe to started/ended notices.
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionNotice> {
        self.inner.notices.subscribe()
    }

    /// Whether a batch is live.
    pub fn transition_is_pending(&self) -> bool {
        self.lock().current.is_some()
    }

    pub fn current(&self) -> Option<Transition> {
        self.lock().current.clone()
    }

    pub fn next(&self) -> Option<Transition> {
        self.lock().next.clone()
    }

    /// Schedule `update` and return the batch it joined.
    pub fn start_transition<F, Fut>(&self, update: F, transition_type: Option<&str>) -> Transition
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CallbackResult> + Send + 'static,
    {
        let callback = update_callback(update);
        let transition_type = transition_type.map(str::to_string);

        let (batch, fresh) = {
            let mut state = self.lock();
            match state.current.clone() {
                None => {
                    let batch = self.new_batch(transition_type.clone());
                    // A batch that has not run yet is never sealed
                    let _ = batch.try_enqueue(callback);
                    state.current = Some(batch.clone());
                    (batch, true)
                }
                Some(current) => match current.try_enqueue(callback) {
                    Ok(()) => {
                        tracing::debug!(transition = current.id(), "Update folded into current transition");
                        (current, false)
                    }
                    Err(mut callback) => {
                        // A skipped `next` runs early and seals; queue behind
                        // a fresh batch instead
                        let next = loop {
                            let candidate = match state.next.clone() {
                                Some(next) => next,
                                None => {
                                    let next = self.new_batch(transition_type.clone());
                                    state.next = Some(next.clone());
                                    next
                                }
                            };
                            match candidate.try_enqueue(callback) {
                                Ok(()) => break candidate,
                                Err(rejected) => {
                                    tracing::debug!(
                                        transition = candidate.id(),
                                        "Queued transition already sealed, replacing it"
                                    );
                                    callback = rejected;
                                    state.next = None;
                                }
                            }
                        };
                        tracing::debug!(
                            current = current.id(),
                            next = next.id(),
                            "Update deferred to next transition"
                        );
                        (next, false)
                    }
                },
            }
        };

        metrics::record_pending_transitions(self.pending_count());
        self.announce(&batch, transition_type);
        if fresh {
            self.watch(&batch);
            batch.run();
        }
        batch
    }

    fn new_batch(&self, transition_type: Option<String>) -> Transition {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        metrics::record_transition_started();
        Transition::new(id, self.inner.animator.clone(), transition_type)
    }

    fn announce(&self, batch: &Transition, transition_type: Option<String>) {
        let _ = self.inner.notices.send(TransitionNotice::Started {
            transition: batch.id(),
            transition_type: transition_type.clone(),
        });
        let notices = self.inner.notices.clone();
        let id = batch.id();
        batch.finished().on_settle(move |outcome| {
            let _ = notices.send(TransitionNotice::Ended {
                transition: id,
                transition_type,
                outcome: outcome.clone(),
            });
        });
    }

    /// Promote `next` (or clear `current`) once `batch` finishes.
    fn watch(&self, batch: &Transition) {
        let weak: Weak<SchedulerInner> = Arc::downgrade(&self.inner);
        let id = batch.id();
        batch.finished().on_settle(move |_| {
            if let Some(inner) = weak.upgrade() {
                TransitionScheduler { inner }.promote(id);
            }
        });
    }

    fn promote(&self, finished: u64) {
        let promoted = {
            let mut state = self.lock();
            if state.current.as_ref().map(Transition::id) != Some(finished) {
                return;
            }
            match state.next.take() {
                Some(next) => {
                    state.current = Some(next.clone());
                    Some(next)
                }
                None => {
                    state.current = None;
                    None
                }
            }
        };
        metrics::record_pending_transitions(self.pending_count());

        match promoted {
            Some(next) => {
                tracing::debug!(finished, promoted = next.id(), "Promoting queued transition");
                self.watch(&next);
                next.run();
            }
            None => tracing::trace!(finished, "Transition queue drained"),
        }
    }

    fn pending_count(&self) -> usize {
        let state = self.lock();
        state.current.iter().count() + state.next.iter().count()
    }

    fn lock(&self) -> MutexGuard<'_, ProcessState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
