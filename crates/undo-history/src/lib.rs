#![forbid(unsafe_code)]

//! Linear undo/redo history.
//!
//! This crate records reversible changes made by an application and replays
//! them backward (undo) and forward (redo). It supports:
//!
//! - **Standard actions**: a fixed pair of forward/backward closures
//! - **Self-inverting actions**: an [`Undoable`] that produces its own
//!   inverse every time it fires
//! - **Grouping**: nested groups committed or rolled back as one step
//! - **Bounded history**: oldest entries evicted past `levels_of_undo`
//! - **Lifecycle events**: observers notified before/after undo and redo
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        UndoManager                           │
//! │  ┌──────────────────┐        ┌────────────────────────────┐  │
//! │  │  PendingGroups   │ routes │  changes: [a, b, G, c]     │  │
//! │  │  (open groups)   │ ─────► │                ^ cursor    │  │
//! │  └──────────────────┘        └────────────────────────────┘  │
//! │           │                         undo() ◄──► redo()       │
//! │           ▼                                                  │
//! │      Observers ── WillUndo / DidUndo / GroupClosed / ...     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use undo_history::UndoManager;
//!
//! let x = Arc::new(AtomicI64::new(0));
//! let mut history = UndoManager::default();
//!
//! let (fwd, bwd) = (x.clone(), x.clone());
//! history
//!     .perform_change(
//!         "set x",
//!         move || fwd.store(1, Ordering::SeqCst),
//!         move || bwd.store(0, Ordering::SeqCst),
//!     )
//!     .unwrap();
//! assert_eq!(x.load(Ordering::SeqCst), 1);
//!
//! history.undo().unwrap();
//! assert_eq!(x.load(Ordering::SeqCst), 0);
//! assert_eq!(history.redo_description(), "set x");
//! ```
//!
//! # Module Structure
//!
//! - [`action`]: the [`Action`] sum type (standard, dynamic, group)
//! - [`undoable`]: self-inverting [`Undoable`] values and pair helpers
//! - [`history`]: the [`UndoManager`] state machine
//! - [`events`]: [`UndoEvent`] and the observer registry
//! - [`shared`]: [`SharedUndoManager`], a lockable handle for closures
//! - [`config`]: [`UndoConfig`]
//! - [`error`]: [`UndoError`] and [`Precondition`]
//!
//! # Design Notes
//!
//! ## Why Actions Store Closures
//!
//! History never inspects application state. Each action captures what it
//! needs to reverse itself, so the manager works with any model.
//!
//! ## Why Open Groups Live in History
//!
//! `begin_group` registers the group immediately, so it takes its final
//! position (and discards the redo tail) up front. Cancelling a top-level
//! group puts back whatever opening it displaced.

pub mod action;
pub mod config;
pub mod error;
pub mod events;
mod grouping;
pub mod history;
pub mod shared;
pub mod undoable;

pub use action::{Action, ActionKind, Closure, DynamicAction, GroupAction, StandardAction};
pub use config::{DEFAULT_GROUP_DESCRIPTION, UndoConfig};
#[cfg(feature = "config")]
pub use error::ConfigError;
pub use error::{Precondition, UndoError, UndoResult};
pub use events::{ObserverId, Observers, UndoEvent};
pub use history::UndoManager;
pub use shared::{SharedGuard, SharedUndoManager};
pub use undoable::{Undoable, ignore_undo, undoable_force_from, undoable_from};
