//! # Closure-backed teardown hooks.
//!
//! [`TeardownFn`] wraps a synchronous closure `F: Fn(bool) -> Result<(), TeardownError>`;
//! [`AsyncTeardownFn`] wraps a closure producing a fresh future per call.
//! Both implement [`Teardown`], so constructor-supplied closures flow through
//! the same state machine as hand-written trait impls — they are adapters,
//! not a special case.
//!
//! ## Example
//! ```
//! use disposekit::{TeardownFn, TeardownRef};
//!
//! let hook: TeardownRef = TeardownFn::arc(|explicit| {
//!     if explicit {
//!         // release resources...
//!     }
//!     Ok(())
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TeardownError;
use crate::teardown::hook::Teardown;

/// Function-backed synchronous teardown.
#[derive(Debug)]
pub struct TeardownFn<F> {
    f: F,
}

impl<F> TeardownFn<F>
where
    F: Fn(bool) -> Result<(), TeardownError> + Send + Sync + 'static,
{
    /// Creates a new function-backed teardown hook.
    ///
    /// Prefer [`TeardownFn::arc`] when you immediately need a
    /// [`TeardownRef`](crate::TeardownRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the hook and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F> Teardown for TeardownFn<F>
where
    F: Fn(bool) -> Result<(), TeardownError> + Send + Sync + 'static,
{
    fn on_dispose(&self, explicit: bool) -> Result<(), TeardownError> {
        (self.f)(explicit)
    }
}

/// Function-backed asynchronous teardown.
///
/// Wraps a closure that *creates* a new future per call.
///
/// ## Example
/// ```
/// use disposekit::{AsyncTeardownFn, TeardownRef};
///
/// let hook: TeardownRef = AsyncTeardownFn::arc(|_explicit| async {
///     // flush asynchronously...
///     Ok(())
/// });
/// ```
#[derive(Debug)]
pub struct AsyncTeardownFn<F> {
    f: F,
}

impl<F, Fut> AsyncTeardownFn<F>
where
    F: Fn(bool) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TeardownError>> + Send + 'static,
{
    /// Creates a new function-backed asynchronous teardown hook.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the hook and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Teardown for AsyncTeardownFn<F>
where
    F: Fn(bool) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TeardownError>> + Send + 'static,
{
    async fn on_dispose_async(&self, explicit: bool) -> Result<(), TeardownError> {
        (self.f)(explicit).await
    }
}
