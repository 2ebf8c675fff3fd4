#![forbid(unsafe_code)]

//! Error types for the undo history.
//!
//! Every failure surfaced by this crate is a programming error on the caller's
//! side (a broken contract) or an explicitly unsupported operation. Nothing is
//! transient, so nothing is retried. Callers that want to treat "empty
//! history" as normal should check [`UndoManager::can_undo`] /
//! [`UndoManager::can_redo`] first.
//!
//! [`UndoManager::can_undo`]: crate::UndoManager::can_undo
//! [`UndoManager::can_redo`]: crate::UndoManager::can_redo

use thiserror::Error;

/// Result alias used throughout the crate.
pub type UndoResult<T = ()> = Result<T, UndoError>;

/// Errors returned by history, grouping and action operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UndoError {
    /// The caller broke an operation's contract.
    #[error("precondition violated: {0}")]
    Precondition(#[from] Precondition),
    /// The operation exists on the surface but is deliberately not implemented.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    /// Internal bookkeeping no longer matches the history tree.
    #[error("history is inconsistent: {0}")]
    Inconsistent(&'static str),
}

impl UndoError {
    /// True for contract breaches.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    /// True for operations that are intentionally unimplemented.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    /// The violated precondition, if this is a contract breach.
    #[must_use]
    pub fn precondition(&self) -> Option<&Precondition> {
        match self {
            Self::Precondition(p) => Some(p),
            _ => None,
        }
    }
}

/// The specific contract an operation was called in breach of.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Precondition {
    /// `undo` on an action whose effect is not currently applied.
    #[error("cannot undo '{description}': action is not done")]
    ActionNotDone { description: String },
    /// `redo` on an action whose effect is already applied.
    #[error("cannot redo '{description}': action is already done")]
    ActionAlreadyDone { description: String },
    /// `undo` with the cursor before the first entry.
    #[error("nothing to undo")]
    NothingToUndo,
    /// `redo` with the cursor on the last entry.
    #[error("nothing to redo")]
    NothingToRedo,
    /// `end_group` / `cancel_group` with no open group.
    #[error("no undo group is open")]
    NoOpenGroup,
    /// `cancel_group` on a group that is no longer being built.
    #[error("undo group '{description}' is not pending")]
    GroupNotPending { description: String },
    /// A forced undoable extraction found nothing.
    #[error("operation was expected to be undoable")]
    MissingUndoable,
    /// `enable_registration` without a matching `disable_registration`.
    #[error("registration is not disabled")]
    RegistrationNotDisabled,
    /// A history operation was issued from inside an undo/redo replay.
    #[error("re-entrant call during undo/redo replay")]
    Reentrant,
}

/// Errors produced while loading an [`UndoConfig`](crate::UndoConfig).
#[cfg(feature = "config")]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading a file.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parse error.
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    /// JSON parse error.
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    /// Parsed values failed validation.
    #[error("invalid config: {}", .0.join("; "))]
    Validation(Vec<String>),
}
