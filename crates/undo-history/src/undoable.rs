#![forbid(unsafe_code)]

//! Self-inverting values.
//!
//! An [`Undoable`] describes an operation that has just been performed and
//! carries a one-shot function that reverses it. Reversing returns a new
//! `Undoable` describing the reversal, whose own function re-applies the
//! first operation, and so on forever:
//!
//! ```text
//! Undoable("increment") --invert--> Undoable("decrement") --invert--> Undoable("increment") ...
//! ```
//!
//! Operations that produce a result alongside their inverse return
//! `(T, Undoable)` pairs; the free functions here pick those pairs apart.
//! Registering the undoable half is done through
//! [`UndoManager::register_undo`](crate::UndoManager::register_undo).

use std::fmt;

use crate::error::{Precondition, UndoError};

type InvertFn = Box<dyn FnOnce() -> Undoable + Send>;

/// A value describing a performed operation and how to reverse it.
pub struct Undoable {
    description: String,
    undo: InvertFn,
}

impl fmt::Debug for Undoable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Undoable")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Undoable {
    /// Create a new undoable.
    ///
    /// `undo` must reverse the operation described by `description` and
    /// return the undoable that re-applies it.
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        undo: impl FnOnce() -> Undoable + Send + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            undo: Box::new(undo),
        }
    }

    /// Human-readable label of the operation this value represents.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Reverse the operation, returning the value that reverses the reversal.
    #[must_use = "the returned undoable is the only way to re-apply the operation"]
    pub fn invert(self) -> Undoable {
        (self.undo)()
    }
}

/// Keep the result and drop the undo information without registering it.
pub fn ignore_undo<T>(pair: (T, Undoable)) -> T {
    pair.0
}

/// Keep only the undoable half of a pair.
pub fn undoable_from<T>(pair: (T, Undoable)) -> Undoable {
    pair.1
}

/// Extract the undoable half of a pair that the caller asserts must be present.
///
/// # Errors
///
/// Returns [`Precondition::MissingUndoable`] when the operation produced no
/// undoable.
pub fn undoable_force_from<T>(pair: (T, Option<Undoable>)) -> Result<Undoable, UndoError> {
    pair.1.ok_or_else(|| Precondition::MissingUndoable.into())
}
