//! Teardown hooks: the [`Teardown`] capability trait, closure adapters,
//! and the [`AnonymousDisposable`] convenience wrapper.

mod anonymous;
mod hook;
mod teardown_fn;

pub use anonymous::AnonymousDisposable;
pub use hook::{Teardown, TeardownRef};
pub use teardown_fn::{AsyncTeardownFn, TeardownFn};

pub(crate) use hook::NoopTeardown;
