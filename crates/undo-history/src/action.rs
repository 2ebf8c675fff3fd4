#![forbid(unsafe_code)]

//! Recorded actions.
//!
//! An [`Action`] is one unit of history that can reverse and re-apply its
//! effect. There are three kinds:
//!
//! - **Standard**: a fixed pair of forward/backward closures.
//! - **Dynamic**: an [`Undoable`] that regenerates its inverse every time it
//!   fires. Undo and redo both call the same "invert" function.
//! - **Group**: an ordered list of nested actions undone in reverse order and
//!   redone in registration order, as one step.
//!
//! # Invariants
//!
//! - `undo()` requires `is_done()`; `redo()` requires `!is_done()`.
//! - A call that breaks this returns [`Precondition::ActionNotDone`] /
//!   [`Precondition::ActionAlreadyDone`] and runs nothing.
//! - Each successful call applies its effect exactly once and flips `done`.

use std::fmt;

use crate::error::{Precondition, UndoError, UndoResult};
use crate::undoable::Undoable;

/// A forward or backward effect of a standard action.
pub type Closure = Box<dyn FnMut() + Send>;

/// Which variant an [`Action`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Fixed forward/backward closures.
    Standard,
    /// Self-inverting [`Undoable`].
    Dynamic,
    /// Composite of nested actions.
    Group,
}

/// A reversible unit of recorded history.
#[derive(Debug)]
pub enum Action {
    /// Fixed forward/backward closures.
    Standard(StandardAction),
    /// Self-inverting value.
    Dynamic(DynamicAction),
    /// Nested actions undone/redone together.
    Group(GroupAction),
}

impl Action {
    /// Which variant this is.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Standard(_) => ActionKind::Standard,
            Self::Dynamic(_) => ActionKind::Dynamic,
            Self::Group(_) => ActionKind::Group,
        }
    }

    /// Label of the current logical action.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::Standard(action) => &action.description,
            Self::Dynamic(action) => action.description(),
            Self::Group(action) => &action.description,
        }
    }

    /// Whether the forward effect is currently applied.
    #[must_use]
    pub fn is_done(&self) -> bool {
        match self {
            Self::Standard(action) => action.done,
            Self::Dynamic(action) => action.done,
            Self::Group(action) => action.done,
        }
    }

    /// Reverse the effect.
    pub fn undo(&mut self) -> UndoResult {
        match self {
            Self::Standard(action) => action.undo(),
            Self::Dynamic(action) => action.undo(),
            Self::Group(action) => action.undo(),
        }
    }

    /// Re-apply the effect.
    pub fn redo(&mut self) -> UndoResult {
        match self {
            Self::Standard(action) => action.redo(),
            Self::Dynamic(action) => action.redo(),
            Self::Group(action) => action.redo(),
        }
    }

    /// Borrow as a group, if this is one.
    #[must_use]
    pub fn as_group(&self) -> Option<&GroupAction> {
        match self {
            Self::Group(group) => Some(group),
            _ => None,
        }
    }

    pub(crate) fn as_group_mut(&mut self) -> Option<&mut GroupAction> {
        match self {
            Self::Group(group) => Some(group),
            _ => None,
        }
    }
}

fn not_done(description: &str) -> UndoError {
    Precondition::ActionNotDone {
        description: description.to_string(),
    }
    .into()
}

fn already_done(description: &str) -> UndoError {
    Precondition::ActionAlreadyDone {
        description: description.to_string(),
    }
    .into()
}

// ============================================================================
// Standard
// ============================================================================

/// An action with separate forward and backward closures.
///
/// Created in the done state: the forward effect is assumed to have been
/// performed before registration.
pub struct StandardAction {
    description: String,
    forward: Closure,
    backward: Closure,
    done: bool,
}

impl fmt::Debug for StandardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardAction")
            .field("description", &self.description)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl StandardAction {
    /// Create an action whose forward effect has already been applied.
    #[must_use]
    pub fn new(description: impl Into<String>, forward: Closure, backward: Closure) -> Self {
        Self {
            description: description.into(),
            forward,
            backward,
            done: true,
        }
    }

    fn undo(&mut self) -> UndoResult {
        if !self.done {
            return Err(not_done(&self.description));
        }
        (self.backward)();
        self.done = false;
        Ok(())
    }

    fn redo(&mut self) -> UndoResult {
        if self.done {
            return Err(already_done(&self.description));
        }
        (self.forward)();
        self.done = true;
        Ok(())
    }
}

// ============================================================================
// Dynamic
// ============================================================================

/// An action backed by a self-inverting [`Undoable`].
///
/// Undo and redo both consume the current undoable and store the one it
/// returns, so the description follows the logical state.
#[derive(Debug)]
pub struct DynamicAction {
    state: Option<Undoable>,
    done: bool,
}

impl DynamicAction {
    /// Wrap an undoable whose operation has already been performed.
    #[must_use]
    pub fn new(undoable: Undoable) -> Self {
        Self {
            state: Some(undoable),
            done: true,
        }
    }

    fn description(&self) -> &str {
        self.state.as_ref().map_or("", Undoable::description)
    }

    fn undo(&mut self) -> UndoResult {
        if !self.done {
            return Err(not_done(self.description()));
        }
        self.invert()?;
        self.done = false;
        Ok(())
    }

    fn redo(&mut self) -> UndoResult {
        if self.done {
            return Err(already_done(self.description()));
        }
        self.invert()?;
        self.done = true;
        Ok(())
    }

    fn invert(&mut self) -> UndoResult {
        let current = self
            .state
            .take()
            .ok_or(UndoError::Inconsistent("dynamic action has no undoable"))?;
        self.state = Some(current.invert());
        Ok(())
    }
}

// ============================================================================
// Group
// ============================================================================

/// An ordered composite of nested actions that behaves as one step.
///
/// A group starts not done while it is being built and becomes done when it
/// is closed.
#[derive(Debug)]
pub struct GroupAction {
    description: String,
    nested: Vec<Action>,
    done: bool,
}

impl GroupAction {
    /// Create an empty, still-open group.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            nested: Vec::new(),
            done: false,
        }
    }

    /// Label of the group.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the group's nested effects are currently applied.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of directly nested actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nested.len()
    }

    /// Whether the group has no nested actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nested.is_empty()
    }

    /// Nested actions in registration order.
    pub fn nested(&self) -> impl Iterator<Item = &Action> {
        self.nested.iter()
    }

    pub(crate) fn push(&mut self, action: Action) {
        self.nested.push(action);
    }

    pub(crate) fn pop(&mut self) -> Option<Action> {
        self.nested.pop()
    }

    pub(crate) fn set_done(&mut self, done: bool) {
        self.done = done;
    }

    /// The most recently registered nested action, if it is a group.
    pub(crate) fn last_group_mut(&mut self) -> Option<&mut GroupAction> {
        self.nested.last_mut()?.as_group_mut()
    }

    pub(crate) fn undo(&mut self) -> UndoResult {
        if !self.done {
            return Err(not_done(&self.description));
        }
        for action in self.nested.iter_mut().rev() {
            action.undo()?;
        }
        self.done = false;
        Ok(())
    }

    pub(crate) fn redo(&mut self) -> UndoResult {
        if self.done {
            return Err(already_done(&self.description));
        }
        for action in &mut self.nested {
            action.redo()?;
        }
        self.done = true;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
