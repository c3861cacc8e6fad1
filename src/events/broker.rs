//! # One-shot "disposing" event broker.
//!
//! [`DisposingBroker`] notifies observers the instant disposal begins —
//! exactly once, ever. After the single emission the subscriber list is
//! released so observer closures (and whatever they capture) do not outlive
//! the notification.
//!
//! ## Rules
//! - `fire()` runs at most once; later calls are no-ops.
//! - Subscribing after the fire silently returns a dead [`Subscription`];
//!   the callback is dropped, never invoked.
//! - A panicking subscriber is caught and logged; it cannot block other
//!   subscribers or stall disposal.
//! - No ordering is promised among subscribers.
//! - The internal lock is never held while callbacks run, so a callback may
//!   re-enter the owning object's API without deadlocking.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

/// Callback invoked when disposal begins.
type Callback = Box<dyn FnOnce() + Send>;

/// Handle to a registered disposing callback.
///
/// Pass it back to [`unsubscribe`](crate::Disposable::unsubscribe) to remove
/// the callback before the event fires. Handles obtained after the fire are
/// inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

impl Subscription {
    /// Id 0 marks a subscription that was never registered (post-fire).
    const DEAD: Subscription = Subscription(0);

    /// `true` if this handle refers to a callback that was actually
    /// registered (the broker had not fired yet at subscribe time).
    pub fn is_live(&self) -> bool {
        self.0 != 0
    }
}

enum State {
    Pending {
        next_id: u64,
        subscribers: Vec<(u64, Callback)>,
    },
    Fired,
}

/// Single-fire broadcaster for the pre-dispose notification.
pub(crate) struct DisposingBroker {
    state: Mutex<State>,
}

impl DisposingBroker {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State::Pending {
                next_id: 1,
                subscribers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a callback; returns a dead handle if the event already
    /// fired.
    pub(crate) fn subscribe(&self, cb: Callback) -> Subscription {
        let mut state = self.lock();
        match &mut *state {
            State::Pending {
                next_id,
                subscribers,
            } => {
                let id = *next_id;
                *next_id += 1;
                subscribers.push((id, cb));
                Subscription(id)
            }
            State::Fired => Subscription::DEAD,
        }
    }

    /// Removes a callback. Unknown or dead handles are no-ops.
    pub(crate) fn unsubscribe(&self, sub: Subscription) {
        if !sub.is_live() {
            return;
        }
        let mut state = self.lock();
        if let State::Pending { subscribers, .. } = &mut *state {
            subscribers.retain(|(id, _)| *id != sub.0);
        }
    }

    /// Emits the event to every current subscriber, once.
    ///
    /// The subscriber list is taken out under the lock and invoked outside
    /// it. Panics are caught per callback and logged.
    pub(crate) fn fire(&self) {
        let taken = {
            let mut state = self.lock();
            match std::mem::replace(&mut *state, State::Fired) {
                State::Pending { subscribers, .. } => subscribers,
                State::Fired => Vec::new(),
            }
        };
        for (id, cb) in taken {
            if catch_unwind(AssertUnwindSafe(cb)).is_err() {
                log::warn!("disposing subscriber {id} panicked; continuing disposal");
            }
        }
    }
}
