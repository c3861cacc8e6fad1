//! # Cancellation linkage: lifecycle-bound cancellation tokens.
//!
//! [`Linkage`] owns the two lifecycle [`CancellationToken`]s of a disposable
//! object — one cancelled when disposal *starts*, one when it *completes* —
//! and a per-instance registry of derived tokens that merge a lifecycle
//! point with caller-supplied external tokens.
//!
//! ## Architecture
//! ```text
//! cancel_when_disposing(&[])        ──► clone of the own `disposing` token
//! cancel_when_disposing(&[e1, e2]) ──► derived token ──► registry entry
//!                                          │
//!                                          └─► watcher task:
//!                                                e1/e2 fired ─► cancel derived,
//!                                                               remove own entry
//! dispose():
//!   signal_disposing() ─► cancel own token, drain+cancel disposing entries
//!   ... teardown ...
//!   signal_disposed()  ─► cancel own token, drain+cancel remaining entries
//! ```
//!
//! ## Rules
//! - Registration and the "already past this lifecycle point" check are one
//!   critical section under the registry lock; the signal methods cancel the
//!   own token under that same lock. A derived token therefore either lands
//!   in the registry before the drain, or observes the cancelled own token
//!   and comes back pre-cancelled — it can never be orphaned.
//! - The lock is never held while *derived* tokens are cancelled (their
//!   waiters are unknown code) or while watcher tasks run. The one
//!   exception is the own lifecycle token: it is cancelled under the lock,
//!   which is what makes the registration check atomic with the drain.
//! - Watcher self-removal tolerates the entry already being gone: a
//!   concurrent bulk drain is a normal race, not an error.
//! - Every derived token is released exactly once — by its watcher or by the
//!   bulk drain, whichever fires first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

/// Lifecycle point a derived token follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Fires when disposal begins, before the teardown body.
    Disposing,
    /// Fires when teardown has finished, before the stage reads `Complete`.
    Disposed,
}

struct Entry {
    token: CancellationToken,
    phase: Phase,
}

struct Registry {
    next_id: u64,
    entries: HashMap<u64, Entry>,
}

/// Per-instance cancellation state: two lifecycle tokens plus the derived
/// token registry.
pub(crate) struct Linkage {
    disposing: CancellationToken,
    disposed: CancellationToken,
    registry: Mutex<Registry>,
}

impl Linkage {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            disposing: CancellationToken::new(),
            disposed: CancellationToken::new(),
            registry: Mutex::new(Registry {
                next_id: 1,
                entries: HashMap::new(),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn phase_token(&self, phase: Phase) -> &CancellationToken {
        match phase {
            Phase::Disposing => &self.disposing,
            Phase::Disposed => &self.disposed,
        }
    }

    /// Returns a token cancelled at the given lifecycle point, merged with
    /// any `externals`.
    ///
    /// With no externals this is a clone of the object's own lifecycle token
    /// (shared state, no allocation, no registration). With externals a
    /// fresh derived token is registered and a watcher task is spawned; this
    /// path must run inside a Tokio runtime.
    pub(crate) fn link(
        self: &Arc<Self>,
        phase: Phase,
        externals: &[CancellationToken],
    ) -> CancellationToken {
        if externals.is_empty() {
            return self.phase_token(phase).clone();
        }

        let derived = CancellationToken::new();
        let id = {
            let mut reg = self.lock();
            if self.phase_token(phase).is_cancelled() {
                // Already past this lifecycle point: hand back a token that
                // is cancelled right now, with no registration to leak.
                drop(reg);
                derived.cancel();
                return derived;
            }
            let id = reg.next_id;
            reg.next_id += 1;
            reg.entries.insert(
                id,
                Entry {
                    token: derived.clone(),
                    phase,
                },
            );
            id
        };

        let waits: Vec<_> = externals
            .iter()
            .map(|t| Box::pin(t.clone().cancelled_owned()))
            .collect();
        let me = Arc::clone(self);
        let watched = derived.clone();
        tokio::spawn(async move {
            tokio::select! {
                // Lifecycle (or bulk drain) fired the derived token first;
                // nothing left to merge.
                _ = watched.cancelled() => {}
                _ = futures::future::select_all(waits) => {
                    watched.cancel();
                }
            }
            me.release(id);
        });

        derived
    }

    /// Drops the registry entry for a derived token that has fired.
    ///
    /// A missing entry means the bulk drain got there first; that is fine.
    fn release(&self, id: u64) {
        self.lock().entries.remove(&id);
    }

    /// Cancels the "disposing" lifecycle token and every registered
    /// disposing-phase derived token.
    pub(crate) fn signal_disposing(&self) {
        let drained = {
            let mut reg = self.lock();
            self.disposing.cancel();
            drain_phase(&mut reg, Phase::Disposing)
        };
        for token in drained {
            token.cancel();
        }
    }

    /// Cancels the "disposed" lifecycle token and every remaining derived
    /// token, regardless of phase.
    ///
    /// Draining everything here is the bulk-release guarantee: no derived
    /// token outlives its owner un-fired.
    pub(crate) fn signal_disposed(&self) {
        let drained: Vec<CancellationToken> = {
            let mut reg = self.lock();
            self.disposed.cancel();
            reg.entries.drain().map(|(_, e)| e.token).collect()
        };
        for token in drained {
            token.cancel();
        }
    }

    #[cfg(test)]
    fn registered(&self) -> usize {
        self.lock().entries.len()
    }
}

fn drain_phase(reg: &mut Registry, phase: Phase) -> Vec<CancellationToken> {
    let ids: Vec<u64> = reg
        .entries
        .iter()
        .filter(|(_, e)| e.phase == phase)
        .map(|(id, _)| *id)
        .collect();
    ids.into_iter()
        .filter_map(|id| reg.entries.remove(&id))
        .map(|e| e.token)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    const TICK: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_no_externals_returns_shared_lifecycle_token() {
        let linkage = Linkage::new();
        let token = linkage.link(Phase::Disposing, &[]);
        assert!(!token.is_cancelled());
        assert_eq!(linkage.registered(), 0);

        linkage.signal_disposing();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_lifecycle_fires_derived_token() {
        let linkage = Linkage::new();
        let external = CancellationToken::new();
        let derived = linkage.link(Phase::Disposing, &[external.clone()]);
        assert_eq!(linkage.registered(), 1);

        linkage.signal_disposing();
        assert!(derived.is_cancelled());
        assert!(!external.is_cancelled());
    }

    #[tokio::test]
    async fn test_external_fires_derived_without_touching_lifecycle() {
        let linkage = Linkage::new();
        let external = CancellationToken::new();
        let derived = linkage.link(Phase::Disposing, &[external.clone()]);

        external.cancel();
        timeout(TICK, derived.cancelled()).await.unwrap();

        // The object itself is untouched.
        assert!(!linkage.disposing.is_cancelled());
        assert!(!linkage.disposed.is_cancelled());

        // The watcher removed its own registry entry.
        timeout(TICK, async {
            while linkage.registered() != 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_any_of_many_externals_fires_derived() {
        let linkage = Linkage::new();
        let e1 = CancellationToken::new();
        let e2 = CancellationToken::new();
        let derived = linkage.link(Phase::Disposed, &[e1.clone(), e2.clone()]);

        e2.cancel();
        timeout(TICK, derived.cancelled()).await.unwrap();
    }

    #[tokio::test]
    async fn test_already_past_phase_returns_precancelled_without_entry() {
        let linkage = Linkage::new();
        linkage.signal_disposing();
        linkage.signal_disposed();

        let external = CancellationToken::new();
        let disposing = linkage.link(Phase::Disposing, &[external.clone()]);
        let disposed = linkage.link(Phase::Disposed, &[external]);
        assert!(disposing.is_cancelled());
        assert!(disposed.is_cancelled());
        assert_eq!(linkage.registered(), 0);
    }

    #[tokio::test]
    async fn test_signal_disposed_drains_every_phase() {
        let linkage = Linkage::new();
        let external = CancellationToken::new();
        let when_disposed = linkage.link(Phase::Disposed, &[external.clone()]);
        let when_disposing = linkage.link(Phase::Disposing, &[external]);
        assert_eq!(linkage.registered(), 2);

        // Skipping signal_disposing here models an owner dropped without a
        // clean disposal pass: the disposed drain must still fire both.
        linkage.signal_disposed();
        assert!(when_disposed.is_cancelled());
        assert!(when_disposing.is_cancelled());
        assert_eq!(linkage.registered(), 0);
    }

    #[tokio::test]
    async fn test_disposing_drain_leaves_disposed_entries_registered() {
        let linkage = Linkage::new();
        let external = CancellationToken::new();
        let when_disposed = linkage.link(Phase::Disposed, &[external]);

        linkage.signal_disposing();
        assert!(!when_disposed.is_cancelled());
        assert_eq!(linkage.registered(), 1);

        linkage.signal_disposed();
        assert!(when_disposed.is_cancelled());
    }
}
