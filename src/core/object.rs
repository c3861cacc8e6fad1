//! # DisposableObject: delegation trait for wrapper types.
//!
//! Types that hold external resources typically embed a
//! [`Disposable`] field and forward to it. [`DisposableObject`] captures
//! that pattern: implement the single accessor and the whole disposal
//! surface — queries, guards, event, cancellation linkage, both disposal
//! entry points — comes along as defaults.
//!
//! This is the hand-written counterpart of boilerplate a build-time
//! generator would emit in other ecosystems; the runtime works identically
//! either way.
//!
//! ## Example
//! ```
//! use disposekit::{Disposable, DisposableObject};
//!
//! struct Connection {
//!     lifecycle: Disposable,
//!     // sockets, buffers...
//! }
//!
//! impl DisposableObject for Connection {
//!     fn disposable(&self) -> &Disposable {
//!         &self.lifecycle
//!     }
//! }
//!
//! # fn send(conn: &Connection) -> Result<(), disposekit::DisposeError> {
//! // At the top of any method that needs a live object:
//! conn.verify_not_disposed_or_disposing()?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::disposable::Disposable;
use crate::error::{DisposeError, TeardownError};
use crate::events::Subscription;

/// Forwarding surface for types embedding a [`Disposable`].
#[async_trait]
pub trait DisposableObject {
    /// The embedded lifecycle primitive.
    fn disposable(&self) -> &Disposable;

    /// See [`Disposable::object_name`].
    fn object_name(&self) -> &str {
        self.disposable().object_name()
    }

    /// See [`Disposable::is_disposing`].
    fn is_disposing(&self) -> bool {
        self.disposable().is_disposing()
    }

    /// See [`Disposable::is_disposed`].
    fn is_disposed(&self) -> bool {
        self.disposable().is_disposed()
    }

    /// See [`Disposable::is_disposed_or_disposing`].
    fn is_disposed_or_disposing(&self) -> bool {
        self.disposable().is_disposed_or_disposing()
    }

    /// See [`Disposable::verify_not_disposing`].
    fn verify_not_disposing(&self) -> Result<(), DisposeError> {
        self.disposable().verify_not_disposing()
    }

    /// See [`Disposable::verify_not_disposed`].
    fn verify_not_disposed(&self) -> Result<(), DisposeError> {
        self.disposable().verify_not_disposed()
    }

    /// See [`Disposable::verify_not_disposed_or_disposing`].
    fn verify_not_disposed_or_disposing(&self) -> Result<(), DisposeError> {
        self.disposable().verify_not_disposed_or_disposing()
    }

    /// See [`Disposable::on_disposing`].
    fn on_disposing<F>(&self, cb: F) -> Subscription
    where
        F: FnOnce() + Send + 'static,
    {
        self.disposable().on_disposing(cb)
    }

    /// See [`Disposable::unsubscribe`].
    fn unsubscribe(&self, sub: Subscription) {
        self.disposable().unsubscribe(sub);
    }

    /// See [`Disposable::cancel_when_disposing`].
    fn cancel_when_disposing(&self, externals: &[CancellationToken]) -> CancellationToken {
        self.disposable().cancel_when_disposing(externals)
    }

    /// See [`Disposable::cancel_when_disposed`].
    fn cancel_when_disposed(&self, externals: &[CancellationToken]) -> CancellationToken {
        self.disposable().cancel_when_disposed(externals)
    }

    /// See [`Disposable::dispose`].
    fn dispose(&self) -> Result<(), TeardownError> {
        self.disposable().dispose()
    }

    /// See [`Disposable::dispose_async`].
    async fn dispose_async(&self) -> Result<(), TeardownError>
    where
        Self: Sync,
    {
        self.disposable().dispose_async().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Widget {
        lifecycle: Disposable,
    }

    impl DisposableObject for Widget {
        fn disposable(&self) -> &Disposable {
            &self.lifecycle
        }
    }

    #[test]
    fn test_forwarding_surface() {
        let closed = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&closed);
        let widget = Widget {
            lifecycle: Disposable::with_sync(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .named("Widget"),
        };

        assert!(!widget.is_disposed_or_disposing());
        widget.verify_not_disposed().unwrap();

        widget.dispose().unwrap();
        widget.dispose().unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(widget.is_disposed());
        assert!(widget.verify_not_disposed().is_err());
        assert!(widget.cancel_when_disposed(&[]).is_cancelled());
        assert_eq!(widget.object_name(), "Widget");
    }

    #[tokio::test]
    async fn test_async_disposal_through_wrapper() {
        let drained = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&drained);
        let widget = Widget {
            lifecycle: Disposable::with_async(move |_| {
                let d = Arc::clone(&d);
                async move {
                    d.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        };

        widget.dispose_async().await.unwrap();
        widget.dispose_async().await.unwrap();
        assert_eq!(drained.load(Ordering::SeqCst), 1);
        assert!(widget.is_disposed());
    }

    #[test]
    fn test_unsubscribe_through_wrapper() {
        let hits = Arc::new(AtomicUsize::new(0));
        let widget = Widget {
            lifecycle: Disposable::new(),
        };
        let h = Arc::clone(&hits);
        let sub = widget.on_disposing(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        widget.unsubscribe(sub);
        widget.dispose().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
