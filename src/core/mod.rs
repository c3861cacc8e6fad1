//! Core disposal machinery: the stage cell, the [`Disposable`] state
//! machine, and the [`DisposableObject`] delegation trait.

mod disposable;
mod object;
mod stage;

pub use disposable::Disposable;
pub use object::DisposableObject;
pub use stage::DisposeStage;
