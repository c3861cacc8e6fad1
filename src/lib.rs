//! # disposekit
//!
//! **disposekit** provides deterministic, exactly-once, thread-safe disposal
//! primitives for objects holding external resources, with synchronous and
//! asynchronous teardown, a one-shot lifecycle event, and cancellation
//! tokens tied to disposal state. The crate is designed as a building block
//! for services, pools and handles that must release resources exactly once
//! however many callers race to shut them down.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!        dispose()                 dispose_async()
//!            │                           │
//!            └──────────┬────────────────┘
//!                       ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │  Disposable (exactly-once state machine)                  │
//! │  - StageCell: AtomicU8, NotStarted → Started → Complete   │
//! │  - DisposingBroker (one-shot event, auto-clearing)        │
//! │  - Linkage (lifecycle tokens + derived-token registry)    │
//! │  - Teardown hook (trait impl or closure adapter)          │
//! └──────┬───────────────────┬──────────────────┬─────────────┘
//!        ▼                   ▼                  ▼
//!   on_disposing()     cancel_when_*()     on_dispose(bool)
//!   subscribers        CancellationTokens  on_dispose_async(bool)
//! ```
//!
//! ### Disposal sequence
//! ```text
//! caller ──► CAS NotStarted→Started          (losers: immediate no-op)
//!              │
//!              ├─► DisposingBroker.fire()    (event, exactly once)
//!              ├─► disposing tokens cancel   (own + derived)
//!              ├─► on_dispose(true)          (sync teardown)
//!              ├─► on_dispose_async(true)    (joined by dispose(),
//!              │                              awaited by dispose_async())
//!              ├─► disposed tokens cancel    (own + remaining derived)
//!              └─► stage → Complete
//! ```
//!
//! ## Features
//! | Area               | Description                                                      | Key types / traits                          |
//! |--------------------|------------------------------------------------------------------|---------------------------------------------|
//! | **State machine**  | Atomic three-stage lifecycle; teardown runs exactly once.        | [`Disposable`], [`DisposeStage`]            |
//! | **Teardown hooks** | Trait- or closure-backed release logic, sync and async.          | [`Teardown`], [`TeardownFn`], [`AsyncTeardownFn`] |
//! | **Cancellation**   | Tokens cancelled at either lifecycle point, mergeable with external tokens. | [`Disposable::cancel_when_disposing`] |
//! | **Events**         | One-shot "disposing" notification with panic isolation.          | [`Subscription`]                            |
//! | **Delegation**     | Forwarding surface for types embedding a `Disposable`.           | [`DisposableObject`]                        |
//! | **Errors**         | Typed errors for guards and teardown failures.                   | [`DisposeError`], [`TeardownError`]         |
//!
//! ## Example
//! ```rust
//! use disposekit::{Disposable, TeardownError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), TeardownError> {
//!     let pool = Disposable::with_async(|_explicit| async move {
//!         // drain connections, flush buffers...
//!         Ok(())
//!     })
//!     .named("ConnPool");
//!
//!     // Anything holding this token stops the moment disposal begins.
//!     let stop = pool.cancel_when_disposing(&[]);
//!
//!     pool.on_disposing(|| println!("pool is going away"));
//!
//!     pool.dispose_async().await?;
//!     assert!(pool.is_disposed());
//!     assert!(stop.is_cancelled());
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees
//! - The teardown body runs **exactly once**, no matter how many threads or
//!   tasks call `dispose()`/`dispose_async()` concurrently or in sequence.
//! - Event fires before the disposing tokens; disposing tokens fire before
//!   teardown; teardown completes before the disposed tokens; disposed
//!   tokens fire before `is_disposed()` reads `true`.
//! - A failed teardown wedges the object at `Started` (fail-stuck); the
//!   error surfaces at the disposal call site and retries are silent no-ops.
//! - Dropping an undisposed `Disposable` runs a best-effort pass: the sync
//!   hook with `explicit = false`, with every outstanding derived token
//!   still released.

mod cancel;
mod core;
mod error;
mod events;
mod teardown;

// ---- Public re-exports ----

pub use core::{Disposable, DisposableObject, DisposeStage};
pub use error::{DisposeError, TeardownError};
pub use events::Subscription;
pub use teardown::{AnonymousDisposable, AsyncTeardownFn, Teardown, TeardownFn, TeardownRef};
