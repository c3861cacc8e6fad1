//! Cancellation linkage: lifecycle-bound [`CancellationToken`]s and the
//! per-instance derived-token registry.
//!
//! [CancellationToken]: tokio_util::sync::CancellationToken

mod linkage;

pub(crate) use linkage::{Linkage, Phase};
