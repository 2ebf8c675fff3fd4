#![forbid(unsafe_code)]

//! Shared, lockable handle to an [`UndoManager`].
//!
//! [`SharedUndoManager`] puts one manager behind a single exclusive lock so
//! that recorded closures (and observers) can capture a clone of the handle
//! and talk back to the manager that is driving them.
//!
//! The handle remembers which thread is currently inside the manager. Calls
//! from that thread cannot take the lock again, so:
//!
//! - registrations are dropped (nothing is recorded while replaying)
//! - every other operation returns [`Precondition::Reentrant`]
//!
//! Other threads simply block until the lock is free.
//!
//! ```
//! use undo_history::SharedUndoManager;
//!
//! let shared = SharedUndoManager::default();
//! let inner = shared.clone();
//! shared
//!     .register_change(
//!         "notify",
//!         || {},
//!         move || {
//!             // Recording from inside an undo is silently ignored.
//!             inner.register_change("echo", || {}, || {}).unwrap();
//!         },
//!     )
//!     .unwrap();
//!
//! shared.undo().unwrap();
//! assert_eq!(shared.lock().unwrap().len(), 1);
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, MutexGuard};

use crate::config::UndoConfig;
use crate::error::{Precondition, UndoResult};
use crate::history::UndoManager;
use crate::undoable::Undoable;

/// Cloneable handle to one [`UndoManager`] behind an exclusive lock.
#[derive(Clone, Default)]
pub struct SharedUndoManager {
    manager: Arc<Mutex<UndoManager>>,
    owner: Arc<Mutex<Option<ThreadId>>>,
}

impl fmt::Debug for SharedUndoManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedUndoManager")
            .field("owner", &*self.owner.lock())
            .field("handles", &Arc::strong_count(&self.manager))
            .finish()
    }
}

impl From<UndoManager> for SharedUndoManager {
    fn from(manager: UndoManager) -> Self {
        Self {
            manager: Arc::new(Mutex::new(manager)),
            owner: Arc::new(Mutex::new(None)),
        }
    }
}

/// Clears the owning thread when the lock is released, including on panic.
struct OwnerGuard<'a> {
    owner: &'a Mutex<Option<ThreadId>>,
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        *self.owner.lock() = None;
    }
}

/// Exclusive access to the shared manager.
///
/// Dereferences to [`UndoManager`]. While it is alive, calls through any
/// clone of the handle from the same thread are treated as re-entrant.
pub struct SharedGuard<'a> {
    // Declared first: the owner must be cleared before the manager unlocks.
    _owner: OwnerGuard<'a>,
    manager: MutexGuard<'a, UndoManager>,
}

impl Deref for SharedGuard<'_> {
    type Target = UndoManager;

    fn deref(&self) -> &UndoManager {
        &self.manager
    }
}

impl DerefMut for SharedGuard<'_> {
    fn deref_mut(&mut self) -> &mut UndoManager {
        &mut self.manager
    }
}

impl SharedUndoManager {
    /// Create a handle to a new manager.
    #[must_use]
    pub fn new(config: UndoConfig) -> Self {
        Self::from(UndoManager::new(config))
    }

    /// Whether the calling thread is currently inside the manager (for
    /// example running an undo, a redo or an observer).
    #[must_use]
    pub fn is_reentrant(&self) -> bool {
        *self.owner.lock() == Some(thread::current().id())
    }

    /// Lock the manager for direct use.
    ///
    /// # Errors
    ///
    /// [`Precondition::Reentrant`] when called from the thread that already
    /// holds the lock.
    pub fn lock(&self) -> UndoResult<SharedGuard<'_>> {
        if self.is_reentrant() {
            tracing::warn!(target: "undo.shared", "re-entrant call rejected");
            return Err(Precondition::Reentrant.into());
        }
        let manager = self.manager.lock();
        *self.owner.lock() = Some(thread::current().id());
        Ok(SharedGuard {
            _owner: OwnerGuard { owner: &self.owner },
            manager,
        })
    }

    /// Run `f` with exclusive access to the manager.
    pub fn with<R>(&self, f: impl FnOnce(&mut UndoManager) -> R) -> UndoResult<R> {
        let mut guard = self.lock()?;
        Ok(f(&mut *guard))
    }

    /// Registration entry point: dropped when re-entrant.
    fn register_with(
        &self,
        description: &str,
        f: impl FnOnce(&mut UndoManager) -> UndoResult,
    ) -> UndoResult {
        if self.is_reentrant() {
            tracing::debug!(
                target: "undo.shared",
                description,
                "registration during replay dropped"
            );
            return Ok(());
        }
        f(&mut *self.lock()?)
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// See [`UndoManager::register_change`].
    pub fn register_change(
        &self,
        description: impl Into<String>,
        forward: impl FnMut() + Send + 'static,
        backward: impl FnMut() + Send + 'static,
    ) -> UndoResult {
        let description = description.into();
        self.register_with(&description.clone(), |mgr| {
            mgr.register_change(description, forward, backward)
        })
    }

    /// See [`UndoManager::perform_change`]. `forward` runs without the lock held.
    pub fn perform_change(
        &self,
        description: impl Into<String>,
        mut forward: impl FnMut() + Send + 'static,
        backward: impl FnMut() + Send + 'static,
    ) -> UndoResult {
        forward();
        self.register_change(description, forward, backward)
    }

    /// See [`UndoManager::register_undoable`].
    pub fn register_undoable(&self, undoable: Undoable) -> UndoResult {
        let description = undoable.description().to_string();
        self.register_with(&description, |mgr| mgr.register_undoable(undoable))
    }

    /// See [`UndoManager::register_undo`].
    pub fn register_undo<T>(&self, pair: (T, Undoable)) -> UndoResult<T> {
        let (result, undoable) = pair;
        self.register_undoable(undoable)?;
        Ok(result)
    }

    /// See [`UndoManager::register_undo_opt`].
    pub fn register_undo_opt<T>(&self, pair: (T, Option<Undoable>)) -> UndoResult<T> {
        let (result, undoable) = pair;
        if let Some(undoable) = undoable {
            self.register_undoable(undoable)?;
        }
        Ok(result)
    }

    // ========================================================================
    // Replay
    // ========================================================================

    /// See [`UndoManager::undo`].
    pub fn undo(&self) -> UndoResult {
        self.lock()?.undo()
    }

    /// See [`UndoManager::redo`].
    pub fn redo(&self) -> UndoResult {
        self.lock()?.redo()
    }

    // ========================================================================
    // Grouping
    // ========================================================================

    /// See [`UndoManager::begin_group`].
    pub fn begin_group(&self, description: impl Into<String>) -> UndoResult {
        self.lock()?.begin_group(description)
    }

    /// See [`UndoManager::end_group`].
    pub fn end_group(&self) -> UndoResult {
        self.lock()?.end_group()
    }

    /// See [`UndoManager::cancel_group`].
    pub fn cancel_group(&self) -> UndoResult {
        self.lock()?.cancel_group()
    }

    /// Run `block` inside a group. The lock is not held while `block` runs,
    /// so it may register through this handle.
    pub fn group<R>(
        &self,
        description: impl Into<String>,
        block: impl FnOnce(&Self) -> R,
    ) -> UndoResult<R> {
        self.begin_group(description)?;
        let result = block(self);
        self.end_group()?;
        Ok(result)
    }

    /// Like [`group`](Self::group), cancelling the group when `block`
    /// returns `false`.
    pub fn group_if(
        &self,
        description: impl Into<String>,
        block: impl FnOnce(&Self) -> bool,
    ) -> UndoResult<bool> {
        self.begin_group(description)?;
        let keep = block(self);
        if keep {
            self.end_group()?;
        } else {
            self.cancel_group()?;
        }
        Ok(keep)
    }
}
