//! # AnonymousDisposable: one-shot cleanup action as a disposable.
//!
//! [`AnonymousDisposable`] adapts a single `FnOnce()` — or a one-shot async
//! body — into the full disposal lifecycle: queries, event, cancellation
//! linkage, without defining a type or implementing
//! [`Teardown`](crate::Teardown) by hand. The body runs only on *explicit*
//! disposal; the best-effort drop path skips it, matching the usual
//! expectation that an ad-hoc cleanup closure is not safe to run from a
//! destructor it never planned for.
//!
//! It is a plain composition over [`Disposable`]: the closure is wrapped
//! into a hook like any other, nothing in the state machine knows about it.
//!
//! ## Example
//! ```
//! use disposekit::AnonymousDisposable;
//!
//! let guard = AnonymousDisposable::new(|| {
//!     // undo something...
//! });
//! guard.dispose().unwrap();
//! assert!(guard.is_disposed());
//! ```

use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use crate::core::Disposable;
use crate::error::TeardownError;

/// Disposable wrapper around a one-shot cleanup action.
pub struct AnonymousDisposable {
    inner: Disposable,
}

impl AnonymousDisposable {
    /// Wraps a cleanup action that runs on explicit disposal only.
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let slot: Mutex<Option<Box<dyn FnOnce() + Send>>> = Mutex::new(Some(Box::new(action)));
        let inner = Disposable::with_sync(move |explicit| {
            if !explicit {
                return Ok(());
            }
            let action = slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(action) = action {
                action();
            }
            Ok(())
        })
        .named("AnonymousDisposable");
        Self { inner }
    }

    /// Wraps an asynchronous cleanup body that runs on explicit disposal
    /// only.
    ///
    /// The future is awaited at most once — by the winning
    /// [`dispose_async`](Disposable::dispose_async) call, or joined inline
    /// by a winning [`dispose`](Disposable::dispose).
    ///
    /// # Example
    /// ```
    /// use disposekit::AnonymousDisposable;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), disposekit::TeardownError> {
    /// let guard = AnonymousDisposable::new_async(async {
    ///     // flush asynchronously...
    /// });
    /// guard.dispose_async().await?;
    /// assert!(guard.is_disposed());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new_async<Fut>(body: Fut) -> Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let slot: Mutex<Option<Pin<Box<dyn Future<Output = ()> + Send>>>> =
            Mutex::new(Some(Box::pin(body)));
        let inner = Disposable::with_async(move |explicit| {
            let body = if explicit {
                slot.lock().unwrap_or_else(PoisonError::into_inner).take()
            } else {
                None
            };
            async move {
                if let Some(body) = body {
                    body.await;
                }
                Ok(())
            }
        })
        .named("AnonymousDisposable");
        Self { inner }
    }

    /// Wraps a fallible cleanup action; its error surfaces from `dispose()`.
    pub fn try_new<F>(action: F) -> Self
    where
        F: FnOnce() -> Result<(), TeardownError> + Send + 'static,
    {
        let slot: Mutex<Option<Box<dyn FnOnce() -> Result<(), TeardownError> + Send>>> =
            Mutex::new(Some(Box::new(action)));
        let inner = Disposable::with_sync(move |explicit| {
            if !explicit {
                return Ok(());
            }
            let action = slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            match action {
                Some(action) => action(),
                None => Ok(()),
            }
        })
        .named("AnonymousDisposable");
        Self { inner }
    }
}

impl Deref for AnonymousDisposable {
    type Target = Disposable;

    fn deref(&self) -> &Disposable {
        &self.inner
    }
}

impl std::fmt::Debug for AnonymousDisposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}
