//! # Teardown hook trait.
//!
//! [`Teardown`] is the extension point through which a type supplies its
//! actual resource-release logic. It replaces the virtual-override pattern of
//! inheritance-based designs with a capability trait: implement whichever of
//! the two hooks applies; both default to no-ops.
//!
//! The `explicit` flag distinguishes an explicit `dispose()`/`dispose_async()`
//! call (`true`) from the best-effort reclaim path taken when a
//! [`Disposable`](crate::Disposable) is dropped without ever being disposed
//! (`false`). Implementations should skip work that is unsafe outside an
//! explicit call — anything that may block, await, or touch collaborators
//! whose own teardown order is unspecified.
//!
//! ## Example
//! ```
//! use async_trait::async_trait;
//! use disposekit::{Teardown, TeardownError};
//!
//! struct Conn;
//!
//! #[async_trait]
//! impl Teardown for Conn {
//!     fn on_dispose(&self, explicit: bool) -> Result<(), TeardownError> {
//!         if explicit {
//!             // flush buffers, close the socket...
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TeardownError;

/// Shared handle to a teardown hook.
pub type TeardownRef = Arc<dyn Teardown>;

/// # Resource-release hooks for a disposable object.
///
/// Both hooks default to no-ops so implementors only provide the variant
/// they need. When both are provided, the synchronous hook always runs
/// first, on both disposal paths.
#[async_trait]
pub trait Teardown: Send + Sync + 'static {
    /// Synchronous teardown body.
    ///
    /// `explicit` is `false` only on the best-effort `Drop` path, where
    /// errors are logged rather than propagated.
    fn on_dispose(&self, explicit: bool) -> Result<(), TeardownError> {
        let _ = explicit;
        Ok(())
    }

    /// Asynchronous teardown body.
    ///
    /// Runs after [`on_dispose`](Teardown::on_dispose). `dispose()` joins it
    /// by blocking the calling thread; `dispose_async()` awaits it. Never
    /// invoked on the `Drop` path.
    async fn on_dispose_async(&self, explicit: bool) -> Result<(), TeardownError> {
        let _ = explicit;
        Ok(())
    }
}

/// No-op teardown used by `Disposable::new()`.
pub(crate) struct NoopTeardown;

#[async_trait]
impl Teardown for NoopTeardown {}
