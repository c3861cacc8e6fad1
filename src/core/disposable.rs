//! # Disposable: the exactly-once disposal state machine.
//!
//! [`Disposable`] gates a teardown body behind an atomic three-stage
//! lifecycle, notifies observers the instant disposal begins, and drives the
//! cancellation linkage at both lifecycle points.
//!
//! ## Disposal sequence (winner of the race)
//! ```text
//! dispose() / dispose_async()
//!     │
//!     ├─ CAS NotStarted → Started          (losers return Ok(()) at once)
//!     ├─ broker.fire()                     (one-shot "disposing" event)
//!     ├─ linkage.signal_disposing()        (own token + derived tokens)
//!     ├─ hook.on_dispose(true)             (sync teardown body)
//!     ├─ hook.on_dispose_async(true)       (joined inline / awaited)
//!     ├─ linkage.signal_disposed()         (own token + remaining derived)
//!     └─ stage → Complete
//! ```
//!
//! ## Rules
//! - Exactly one caller runs the teardown body, however many threads or
//!   tasks race `dispose()`/`dispose_async()` in any combination.
//! - Losing the race is a silent no-op: the loser does **not** wait for the
//!   in-flight disposal to finish.
//! - A teardown error propagates to the winning caller and wedges the stage
//!   at `Started` forever; retrying is a no-op. Fail-stuck is deliberate —
//!   partially-run teardown must never re-run.
//! - `dispose()` joins the async hook by blocking the calling thread
//!   (`futures::executor::block_on`). Inside a current-thread async runtime
//!   that join can deadlock if the hook needs the same runtime to make
//!   progress; prefer [`dispose_async`](Disposable::dispose_async) there.
//! - Dropping an undisposed `Disposable` takes the best-effort path: the
//!   event and both cancellation points still fire (so no derived token is
//!   orphaned), `on_dispose(false)` runs with errors and panics logged, and
//!   the async hook is skipped entirely.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cancel::{Linkage, Phase};
use crate::core::stage::{DisposeStage, StageCell};
use crate::error::{DisposeError, TeardownError};
use crate::events::{DisposingBroker, Subscription};
use crate::teardown::{AsyncTeardownFn, NoopTeardown, TeardownFn, TeardownRef};

/// Thread-safe, exactly-once disposal primitive.
///
/// Owns one [`DisposeStage`], a one-shot disposing event, two lifecycle
/// cancellation tokens and the derived-token registry. Embed it in a type
/// holding external resources and forward to it (see
/// [`DisposableObject`](crate::DisposableObject)), or use it standalone with
/// a closure-backed teardown.
///
/// # Example
/// ```
/// use disposekit::Disposable;
///
/// let d = Disposable::with_sync(|_explicit| {
///     // release resources...
///     Ok(())
/// });
/// assert!(!d.is_disposed());
/// d.dispose().unwrap();
/// assert!(d.is_disposed());
/// ```
pub struct Disposable {
    name: String,
    stage: StageCell,
    broker: DisposingBroker,
    linkage: Arc<Linkage>,
    hook: TeardownRef,
}

impl Disposable {
    /// Creates a disposable with a no-op teardown body.
    ///
    /// Useful when only the lifecycle queries, event and cancellation
    /// linkage are needed.
    pub fn new() -> Self {
        Self::with_hook(Arc::new(NoopTeardown))
    }

    /// Creates a disposable from any [`Teardown`](crate::Teardown) hook.
    pub fn with_hook(hook: TeardownRef) -> Self {
        Self {
            name: "Disposable".to_string(),
            stage: StageCell::new(),
            broker: DisposingBroker::new(),
            linkage: Linkage::new(),
            hook,
        }
    }

    /// Creates a disposable from a synchronous teardown closure.
    ///
    /// The closure receives `explicit` (see
    /// [`Teardown::on_dispose`](crate::Teardown::on_dispose)).
    pub fn with_sync<F>(f: F) -> Self
    where
        F: Fn(bool) -> Result<(), TeardownError> + Send + Sync + 'static,
    {
        Self::with_hook(TeardownFn::arc(f))
    }

    /// Creates a disposable from an asynchronous teardown closure.
    pub fn with_async<F, Fut>(f: F) -> Self
    where
        F: Fn(bool) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), TeardownError>> + Send + 'static,
    {
        Self::with_hook(AsyncTeardownFn::arc(f))
    }

    /// Sets the display name used by guard errors and log lines.
    ///
    /// Defaults to `"Disposable"`.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The object's display name.
    pub fn object_name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle stage snapshot.
    pub fn stage(&self) -> DisposeStage {
        self.stage.load()
    }

    /// `true` while disposal is in progress. Never blocks.
    pub fn is_disposing(&self) -> bool {
        self.stage.is_disposing()
    }

    /// `true` once disposal has fully completed. Never blocks.
    pub fn is_disposed(&self) -> bool {
        self.stage.is_disposed()
    }

    /// `true` once disposal has started, complete or not. Never blocks.
    pub fn is_disposed_or_disposing(&self) -> bool {
        self.stage.is_disposed_or_disposing()
    }

    /// Fails with [`DisposeError::UseAfterDispose`] while disposal is in
    /// progress.
    pub fn verify_not_disposing(&self) -> Result<(), DisposeError> {
        if self.is_disposing() {
            return Err(self.use_after_dispose());
        }
        Ok(())
    }

    /// Fails with [`DisposeError::UseAfterDispose`] once disposal has
    /// completed.
    pub fn verify_not_disposed(&self) -> Result<(), DisposeError> {
        if self.is_disposed() {
            return Err(self.use_after_dispose());
        }
        Ok(())
    }

    /// Fails with [`DisposeError::UseAfterDispose`] once disposal has
    /// started. Intended at the top of any method that requires a live
    /// object.
    pub fn verify_not_disposed_or_disposing(&self) -> Result<(), DisposeError> {
        if self.is_disposed_or_disposing() {
            return Err(self.use_after_dispose());
        }
        Ok(())
    }

    fn use_after_dispose(&self) -> DisposeError {
        DisposeError::UseAfterDispose {
            object: self.name.clone(),
        }
    }

    /// Registers a callback invoked the instant disposal begins.
    ///
    /// Fires at most once, before the teardown body runs, on the caller
    /// that won the disposal race. Subscribing after disposal has started
    /// returns an inert [`Subscription`] and the callback is dropped.
    pub fn on_disposing<F>(&self, cb: F) -> Subscription
    where
        F: FnOnce() + Send + 'static,
    {
        self.broker.subscribe(Box::new(cb))
    }

    /// Removes a callback registered with
    /// [`on_disposing`](Disposable::on_disposing). Inert or unknown handles
    /// are no-ops.
    pub fn unsubscribe(&self, sub: Subscription) {
        self.broker.unsubscribe(sub);
    }

    /// Returns a token cancelled when this object starts disposing, or when
    /// any of `externals` is cancelled.
    ///
    /// With an empty slice this is the object's own (shared) disposing
    /// token. With externals a fresh derived token is allocated and tracked;
    /// that path must run inside a Tokio runtime. If disposal has already
    /// started, the returned token is cancelled before this method returns.
    ///
    /// Cancelling an external token fires the derived token only — it never
    /// disposes the object or marks it disposing.
    pub fn cancel_when_disposing(&self, externals: &[CancellationToken]) -> CancellationToken {
        self.linkage.link(Phase::Disposing, externals)
    }

    /// Returns a token cancelled when disposal has fully completed, or when
    /// any of `externals` is cancelled. Same contract as
    /// [`cancel_when_disposing`](Disposable::cancel_when_disposing), keyed
    /// to the "disposed" lifecycle point.
    pub fn cancel_when_disposed(&self, externals: &[CancellationToken]) -> CancellationToken {
        self.linkage.link(Phase::Disposed, externals)
    }

    /// Disposes of this object, if it hasn't already been disposed.
    ///
    /// Blocks the calling thread while joining the asynchronous teardown
    /// hook, mirroring single-exit semantics: when the winning `dispose()`
    /// returns `Ok`, teardown has fully completed. Losers return `Ok(())`
    /// immediately without waiting for the winner.
    pub fn dispose(&self) -> Result<(), TeardownError> {
        if !self.stage.begin() {
            return Ok(());
        }
        self.broker.fire();
        self.linkage.signal_disposing();
        self.hook.on_dispose(true)?;
        futures::executor::block_on(self.hook.on_dispose_async(true))?;
        self.linkage.signal_disposed();
        self.stage.complete();
        Ok(())
    }

    /// Disposes of this object, if it hasn't already been disposed.
    ///
    /// Same gating and ordering as [`dispose`](Disposable::dispose), but the
    /// asynchronous teardown hook is awaited instead of joined, so no worker
    /// thread is blocked.
    pub async fn dispose_async(&self) -> Result<(), TeardownError> {
        if !self.stage.begin() {
            return Ok(());
        }
        self.broker.fire();
        self.linkage.signal_disposing();
        self.hook.on_dispose(true)?;
        self.hook.on_dispose_async(true).await?;
        self.linkage.signal_disposed();
        self.stage.complete();
        Ok(())
    }
}

impl Default for Disposable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Disposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposable")
            .field("name", &self.name)
            .field("stage", &self.stage.load())
            .finish_non_exhaustive()
    }
}

impl Drop for Disposable {
    /// Best-effort reclaim for objects whose explicit disposal never ran.
    ///
    /// The event and both cancellation points still fire so watcher tasks
    /// and derived-token holders are released; `on_dispose(false)` runs with
    /// failures logged, never propagated; the async hook is skipped (there
    /// is nothing to await on in `drop`). An object wedged at `Started` by a
    /// failed teardown skips the hook but still has its remaining derived
    /// tokens drained.
    fn drop(&mut self) {
        if !self.stage.begin() {
            // `drop` holds `&mut self`, so no disposal is in flight; a stage
            // still at `Started` means a failed teardown wedged the object.
            // The disposed-phase linkage never ran for it — drain the
            // registry now so outstanding derived tokens fire and their
            // watcher tasks exit.
            if self.stage.is_disposing() {
                self.linkage.signal_disposed();
            }
            return;
        }
        self.broker.fire();
        self.linkage.signal_disposing();
        match catch_unwind(AssertUnwindSafe(|| self.hook.on_dispose(false))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                log::warn!("{}: best-effort teardown failed: {}", self.name, err.as_message());
            }
            Err(_) => {
                log::warn!("{}: best-effort teardown panicked", self.name);
            }
        }
        self.linkage.signal_disposed();
        self.stage.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn counting(counter: &Arc<AtomicUsize>) -> Disposable {
        let c = Arc::clone(counter);
        Disposable::with_sync(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_fresh_object_reports_all_queries_false() {
        let d = Disposable::new();
        assert!(!d.is_disposing());
        assert!(!d.is_disposed());
        assert!(!d.is_disposed_or_disposing());
        assert_eq!(d.stage(), DisposeStage::NotStarted);
    }

    #[test]
    fn test_sequential_and_concurrent_dispose_runs_teardown_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let d = Arc::new(counting(&counter));

        for _ in 0..3 {
            d.dispose().unwrap();
        }
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let d = Arc::clone(&d);
                std::thread::spawn(move || d.dispose())
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(d.is_disposed());
    }

    #[tokio::test]
    async fn test_dispose_then_dispose_async_runs_teardown_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let d = counting(&counter);
        d.dispose().unwrap();
        d.dispose_async().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let counter = Arc::new(AtomicUsize::new(0));
        let d = counting(&counter);
        d.dispose_async().await.unwrap();
        d.dispose().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_fires_once_before_teardown() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let o = Arc::clone(&order);
        let d = Disposable::with_sync(move |_| {
            o.lock().unwrap().push("teardown");
            Ok(())
        });
        let o = Arc::clone(&order);
        d.on_disposing(move || o.lock().unwrap().push("event"));
        d.dispose().unwrap();
        d.dispose().unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["event", "teardown"]);
    }

    #[test]
    fn test_explicit_flag_is_true_on_dispose() {
        let explicit = Arc::new(AtomicBool::new(false));
        let e = Arc::clone(&explicit);
        let d = Disposable::with_sync(move |flag| {
            e.store(flag, Ordering::SeqCst);
            Ok(())
        });
        d.dispose().unwrap();
        assert!(explicit.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_async_teardown_completes_before_disposed_reads_true() {
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        let d = Disposable::with_async(move |_| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            }
        });
        d.dispose_async().await.unwrap();
        assert!(done.load(Ordering::SeqCst));
        assert!(d.is_disposed());
    }

    #[test]
    fn test_failed_teardown_propagates_and_wedges_object() {
        let d = Disposable::with_sync(|_| Err(TeardownError::fail("refused")));
        let err = d.dispose().unwrap_err();
        assert_eq!(err.as_label(), "teardown_failed");

        // Fail-stuck: never Complete, and a retry does not re-run teardown.
        assert!(!d.is_disposed());
        assert!(d.is_disposing());
        d.dispose().unwrap();
        assert!(!d.is_disposed());
    }

    #[tokio::test]
    async fn test_disposing_token_cancelled_before_teardown_runs() {
        let slot: Arc<Mutex<Option<CancellationToken>>> = Arc::new(Mutex::new(None));
        let seen = Arc::new(AtomicBool::new(false));
        let (s, t) = (Arc::clone(&slot), Arc::clone(&seen));
        let d = Disposable::with_sync(move |_| {
            let token = s.lock().unwrap().clone().unwrap();
            t.store(token.is_cancelled(), Ordering::SeqCst);
            Ok(())
        });
        *slot.lock().unwrap() = Some(d.cancel_when_disposing(&[]));
        d.dispose().unwrap();
        assert!(seen.load(Ordering::SeqCst));
    }

    #[test]
    fn test_disposed_token_cancelled_only_after_teardown() {
        let slot: Arc<Mutex<Option<CancellationToken>>> = Arc::new(Mutex::new(None));
        let during = Arc::new(AtomicBool::new(true));
        let (s, t) = (Arc::clone(&slot), Arc::clone(&during));
        let d = Disposable::with_sync(move |_| {
            let token = s.lock().unwrap().clone().unwrap();
            t.store(token.is_cancelled(), Ordering::SeqCst);
            Ok(())
        });
        let token = d.cancel_when_disposed(&[]);
        *slot.lock().unwrap() = Some(token.clone());
        d.dispose().unwrap();
        assert!(!during.load(Ordering::SeqCst));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancel_when_disposed_on_disposed_object_is_cancelled_synchronously() {
        let d = Disposable::new();
        d.dispose().unwrap();
        assert!(d.cancel_when_disposed(&[]).is_cancelled());
        assert!(d.cancel_when_disposing(&[]).is_cancelled());
    }

    #[tokio::test]
    async fn test_external_cancellation_does_not_dispose_object() {
        let d = Disposable::new();
        let external = CancellationToken::new();
        let derived = d.cancel_when_disposing(&[external.clone()]);

        external.cancel();
        tokio::time::timeout(Duration::from_secs(1), derived.cancelled())
            .await
            .unwrap();

        assert!(!d.is_disposed_or_disposing());
    }

    #[test]
    fn test_verify_guards() {
        let d = Disposable::new().named("Widget");
        d.verify_not_disposing().unwrap();
        d.verify_not_disposed().unwrap();
        d.verify_not_disposed_or_disposing().unwrap();

        d.dispose().unwrap();
        d.verify_not_disposing().unwrap(); // complete, no longer "disposing"
        let err = d.verify_not_disposed().unwrap_err();
        assert!(err.to_string().contains("Widget"));
        assert!(d.verify_not_disposed_or_disposing().is_err());
    }

    #[test]
    fn test_unsubscribed_callback_never_fires() {
        let hits = Arc::new(AtomicUsize::new(0));
        let d = Disposable::new();
        let h = Arc::clone(&hits);
        let sub = d.on_disposing(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        d.unsubscribe(sub);
        d.dispose().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_runs_best_effort_teardown_with_explicit_false() {
        let counter = Arc::new(AtomicUsize::new(0));
        let explicit = Arc::new(AtomicBool::new(true));
        let (c, e) = (Arc::clone(&counter), Arc::clone(&explicit));
        let d = Disposable::with_sync(move |flag| {
            c.fetch_add(1, Ordering::SeqCst);
            e.store(flag, Ordering::SeqCst);
            Ok(())
        });
        drop(d);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!explicit.load(Ordering::SeqCst));
    }

    #[test]
    fn test_drop_after_dispose_does_not_rerun_teardown() {
        let counter = Arc::new(AtomicUsize::new(0));
        let d = counting(&counter);
        d.dispose().unwrap();
        drop(d);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_releases_outstanding_derived_tokens() {
        let d = Disposable::new();
        let external = CancellationToken::new();
        let derived = d.cancel_when_disposed(&[external]);
        drop(d);
        assert!(derived.is_cancelled());
    }

    #[tokio::test]
    async fn test_drop_of_wedged_object_releases_disposed_phase_tokens() {
        let d = Disposable::with_sync(|_| Err(TeardownError::fail("refused")));
        let external = CancellationToken::new();
        let derived = d.cancel_when_disposed(&[external]);

        d.dispose().unwrap_err();
        assert!(d.is_disposing());
        assert!(!derived.is_cancelled());

        // The wedged owner dying must still fire the disposed-phase token.
        drop(d);
        assert!(derived.is_cancelled());
    }

    #[test]
    fn test_object_name_defaults_and_overrides() {
        assert_eq!(Disposable::new().object_name(), "Disposable");
        assert_eq!(Disposable::new().named("Pool").object_name(), "Pool");
    }
}
