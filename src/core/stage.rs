//! # Disposal stage: the three-state lifecycle cell.
//!
//! [`DisposeStage`] names the lifecycle states; [`StageCell`] stores the
//! current state in a single `AtomicU8` and performs the transitions.
//!
//! ## States
//! ```text
//! NotStarted ──begin()──► Started ──complete()──► Complete
//! ```
//!
//! ## Rules
//! - The cell is the **sole source of truth** for all liveness queries;
//!   `is_disposing`, `is_disposed` and `is_disposed_or_disposing` are derived
//!   by comparison on one atomic load, never from separate flags, so readers
//!   can never observe torn or contradictory answers.
//! - `begin()` is a compare-and-swap: exactly one concurrent caller wins the
//!   `NotStarted → Started` transition; everyone else is told they lost.
//! - `NotStarted → Complete` directly is impossible by construction — only
//!   `complete()` stores `Complete`, and it is only reached by the caller
//!   that won `begin()`.
//! - A teardown failure leaves the cell at `Started` forever; there is no
//!   rollback transition.

use std::sync::atomic::{AtomicU8, Ordering};

const NOT_STARTED: u8 = 0;
const STARTED: u8 = 1;
const COMPLETE: u8 = 2;

/// Lifecycle state of a disposable object.
///
/// Strictly monotonic: once [`Started`](DisposeStage::Started), the only
/// remaining transition is to [`Complete`](DisposeStage::Complete).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposeStage {
    /// Disposal has not been requested yet; the object is live.
    NotStarted,
    /// A caller won the disposal race; the teardown body may be running.
    Started,
    /// Teardown finished; the object is fully disposed.
    Complete,
}

/// Atomic holder of a [`DisposeStage`].
///
/// One per disposable instance. All methods are lock-free and never block.
#[derive(Debug)]
pub(crate) struct StageCell {
    stage: AtomicU8,
}

impl StageCell {
    /// Creates a cell at [`DisposeStage::NotStarted`].
    pub(crate) fn new() -> Self {
        Self {
            stage: AtomicU8::new(NOT_STARTED),
        }
    }

    /// Attempts the `NotStarted → Started` transition.
    ///
    /// Returns `true` for the single winner; `false` for every caller that
    /// arrives once disposal has already started or completed.
    pub(crate) fn begin(&self) -> bool {
        self.stage
            .compare_exchange(NOT_STARTED, STARTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Marks the `Started → Complete` transition.
    ///
    /// Only the caller that won [`begin`](StageCell::begin) may call this,
    /// after the teardown body has fully finished.
    pub(crate) fn complete(&self) {
        self.stage.store(COMPLETE, Ordering::Release);
    }

    /// Current stage snapshot.
    pub(crate) fn load(&self) -> DisposeStage {
        match self.stage.load(Ordering::Acquire) {
            NOT_STARTED => DisposeStage::NotStarted,
            STARTED => DisposeStage::Started,
            _ => DisposeStage::Complete,
        }
    }

    /// `true` while disposal is in progress (started, not yet complete).
    pub(crate) fn is_disposing(&self) -> bool {
        self.stage.load(Ordering::Acquire) == STARTED
    }

    /// `true` once disposal has fully completed.
    pub(crate) fn is_disposed(&self) -> bool {
        self.stage.load(Ordering::Acquire) == COMPLETE
    }

    /// `true` once disposal has started, whether or not it has completed.
    pub(crate) fn is_disposed_or_disposing(&self) -> bool {
        self.stage.load(Ordering::Acquire) != NOT_STARTED
    }
}
