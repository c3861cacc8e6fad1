//! Lifecycle events: the one-shot "disposing" broker and its
//! [`Subscription`] handle.

mod broker;

pub use broker::Subscription;

pub(crate) use broker::DisposingBroker;
