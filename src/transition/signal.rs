//! One-shot lifecycle signals.
//!
//! A signal is pending until it settles exactly once with an `Outcome`.
//! Continuations registered with `on_settle` run exactly once, in
//! registration order; late registrations run immediately. `wait` bridges a
//! signal into `async` code.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;

use crate::transition::TransitionError;

/// Settled value of a signal.
pub type Outcome = Result<(), TransitionError>;

type Continuation = Box<dyn FnOnce(&Outcome) + Send>;

enum SignalState {
    Pending(Vec<Continuation>),
    Settled(Outcome),
}

/// Settle-once handle shared by cloning.
#[derive(Clone)]
pub struct Signal {
    state: Arc<Mutex<SignalState>>,
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.lock() {
            SignalState::Pending(waiting) => f
                .debug_struct("Signal")
                .field("pending", &waiting.len())
                .finish(),
            SignalState::Settled(outcome) => f.debug_struct("Signal").field("settled", outcome).finish(),
        }
    }
}

impl Signal {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SignalState::Pending(Vec::new()))),
        }
    }

    /// Settle the signal. Only the first call has an effect; returns whether
    /// this call settled it.
    pub fn settle(&self, outcome: Outcome) -> bool {
        let waiting = {
            let mut state = self.lock();
            match &mut *state {
                SignalState::Settled(_) => return false,
                SignalState::Pending(waiting) => {
                    let waiting = std::mem::take(waiting);
                    *state = SignalState::Settled(outcome.clone());
                    waiting
                }
            }
        };
        for continuation in waiting {
            continuation(&outcome);
        }
        true
    }

    pub fn is_settled(&self) -> bool {
        matches!(&*self.lock(), SignalState::Settled(_))
    }

    /// The outcome, once settled.
    pub fn outcome(&self) -> Option<Outcome> {
        match &*self.lock() {
            SignalState::Settled(outcome) => Some(outcome.clone()),
            SignalState::Pending(_) => None,
        }
    }

    /// Run `f` once the signal settles (immediately if it already has).
    pub fn on_settle<F>(&self, f: F)
    where
        F: FnOnce(&Outcome) + Send + 'static,
    {
        let settled = {
            let mut state = self.lock();
            match &mut *state {
                SignalState::Pending(waiting) => {
                    waiting.push(Box::new(f));
                    return;
                }
                SignalState::Settled(outcome) => outcome.clone(),
            }
        };
        f(&settled);
    }

    /// Wait for the outcome.
    pub async fn wait(&self) -> Outcome {
        let (tx, rx) = oneshot::channel();
        self.on_settle(move |outcome| {
            let _ = tx.send(outcome.clone());
        });
        rx.await.unwrap_or(Err(TransitionError::Abandoned))
    }

    fn lock(&self) -> MutexGuard<'_, SignalState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
