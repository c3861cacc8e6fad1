//! Error types used by the disposekit runtime and teardown hooks.
//!
//! This module defines two main error enums:
//!
//! - [`DisposeError`] — errors raised by the disposal runtime itself
//!   (liveness guard violations).
//! - [`TeardownError`] — errors raised by user-supplied teardown bodies.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for
//! logging/metrics.
//!
//! The split mirrors the call surface: the `verify_*` guards return
//! [`DisposeError`], while `dispose()`/`dispose_async()` surface
//! [`TeardownError`] from whichever hook failed. Losing a disposal race is
//! never an error — losers return `Ok(())`.

use thiserror::Error;

/// # Errors produced by the disposal runtime.
///
/// These represent violations of the liveness contract, raised by the
/// `verify_*` guards when code touches an object that is already
/// disposing or disposed.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DisposeError {
    /// An operation required a live object, but disposal had already started
    /// or completed. Carries the object's display name for diagnostics.
    #[error("{object} used after dispose")]
    UseAfterDispose {
        /// Display name of the object, see `Disposable::object_name`.
        object: String,
    },
}

impl DisposeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use disposekit::DisposeError;
    ///
    /// let err = DisposeError::UseAfterDispose { object: "Conn".into() };
    /// assert_eq!(err.as_label(), "use_after_dispose");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DisposeError::UseAfterDispose { .. } => "use_after_dispose",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DisposeError::UseAfterDispose { object } => {
                format!("object disposed: {object}")
            }
        }
    }
}

/// # Errors produced by teardown execution.
///
/// These represent failures of the user-supplied teardown body (trait hook
/// or closure). They propagate to whichever disposal entry point was
/// invoked; the disposal stage stays at `Started` afterwards (the object is
/// permanently wedged, a retry will not re-run teardown).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TeardownError {
    /// The teardown body returned an error.
    #[error("teardown failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The teardown body panicked. Only reported on paths that isolate
    /// panics (the `Drop` best-effort path); explicit disposal lets panics
    /// unwind to the caller.
    #[error("teardown panicked: {error}")]
    Panicked {
        /// The captured panic payload, best-effort stringified.
        error: String,
    },
}

impl TeardownError {
    /// Shorthand for [`TeardownError::Fail`] from any message-like input.
    ///
    /// # Example
    /// ```
    /// use disposekit::TeardownError;
    ///
    /// let err = TeardownError::fail("socket close failed");
    /// assert_eq!(err.as_label(), "teardown_failed");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        TeardownError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TeardownError::Fail { .. } => "teardown_failed",
            TeardownError::Panicked { .. } => "teardown_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TeardownError::Fail { error } => format!("error: {error}"),
            TeardownError::Panicked { error } => format!("panic: {error}"),
        }
    }
}
