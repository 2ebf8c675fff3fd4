#![forbid(unsafe_code)]

//! Linear undo/redo history.
//!
//! This module provides the [`UndoManager`], which keeps committed actions
//! in one ordered list with a cursor separating applied entries from undone
//! ones:
//!
//! - **Registration**: new actions land in the innermost open group, or are
//!   appended after the cursor when no group is open
//! - **Branch handling**: appending discards everything after the cursor
//! - **Depth limit**: the oldest entries are evicted past `levels_of_undo`
//! - **Grouping**: nested groups become single, atomically reversible entries
//!
//! # Invariants
//!
//! 1. `-1 <= state_index() < len()` (stored as an applied count `0..=len`)
//! 2. Entries up to the cursor are done, entries after it are not
//! 3. `len() <= levels_of_undo` after every top-level registration (if capped)
//! 4. No registration happens while an undo or redo is replaying
//!
//! # Cursor Model
//!
//! ```text
//! register a, b, c
//! ┌───────────────────────────────────────┐
//! │ changes: [a, b, c]   state_index: 2   │
//! └───────────────────────────────────────┘
//!
//! undo() x2
//! ┌───────────────────────────────────────┐
//! │ changes: [a, b, c]   state_index: 0   │
//! │            ^ applied, b and c undone  │
//! └───────────────────────────────────────┘
//!
//! register d   <-- new branch, drops b and c
//! ┌───────────────────────────────────────┐
//! │ changes: [a, d]      state_index: 1   │
//! └───────────────────────────────────────┘
//! ```

use std::collections::VecDeque;
use std::fmt;

use web_time::Instant;

use crate::action::{Action, DynamicAction, GroupAction, StandardAction};
use crate::config::UndoConfig;
use crate::error::{Precondition, UndoError, UndoResult};
use crate::events::{ObserverId, Observers, UndoEvent};
use crate::grouping::{Displaced, GroupFrame, PendingGroups, Slot};
use crate::undoable::Undoable;

/// Undo/redo history for one editing context.
///
/// Create one manager per document (or whatever the host's unit of editing
/// is) and pass it to code that records changes.
pub struct UndoManager {
    /// Committed top-level entries, oldest first.
    changes: VecDeque<Action>,
    /// Number of applied entries (`state_index + 1`).
    applied: usize,
    /// Groups currently being built.
    pending: PendingGroups,
    /// Limits and defaults.
    config: UndoConfig,
    /// Outstanding `disable_registration` calls.
    disabled: usize,
    undoing: bool,
    redoing: bool,
    observers: Observers,
}

impl fmt::Debug for UndoManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoManager")
            .field("len", &self.changes.len())
            .field("state_index", &self.state_index())
            .field("grouping_level", &self.pending.len())
            .field("registration_enabled", &self.is_registration_enabled())
            .field("config", &self.config)
            .field("observers", &self.observers)
            .finish()
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(UndoConfig::default())
    }
}

impl UndoManager {
    /// Create a new manager with the given configuration.
    #[must_use]
    pub fn new(config: UndoConfig) -> Self {
        Self {
            changes: VecDeque::new(),
            applied: 0,
            pending: PendingGroups::default(),
            disabled: usize::from(!config.registration_enabled),
            config,
            undoing: false,
            redoing: false,
            observers: Observers::new(),
        }
    }

    /// Get the current configuration.
    #[must_use]
    pub fn config(&self) -> &UndoConfig {
        &self.config
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Record a change whose effect has already been performed.
    ///
    /// `forward` re-applies the change on redo, `backward` reverses it on
    /// undo. If a group is open the change joins that group.
    pub fn register_change(
        &mut self,
        description: impl Into<String>,
        forward: impl FnMut() + Send + 'static,
        backward: impl FnMut() + Send + 'static,
    ) -> UndoResult {
        self.register(Action::Standard(StandardAction::new(
            description,
            Box::new(forward),
            Box::new(backward),
        )))
    }

    /// Perform a change by running `forward` once, then record it.
    pub fn perform_change(
        &mut self,
        description: impl Into<String>,
        mut forward: impl FnMut() + Send + 'static,
        backward: impl FnMut() + Send + 'static,
    ) -> UndoResult {
        forward();
        self.register_change(description, forward, backward)
    }

    /// Record a self-inverting value whose operation has already been performed.
    pub fn register_undoable(&mut self, undoable: Undoable) -> UndoResult {
        self.register(Action::Dynamic(DynamicAction::new(undoable)))
    }

    /// Record the undoable half of a pair and return the result half.
    pub fn register_undo<T>(&mut self, pair: (T, Undoable)) -> UndoResult<T> {
        let (result, undoable) = pair;
        self.register_undoable(undoable)?;
        Ok(result)
    }

    /// Like [`register_undo`](Self::register_undo), recording only when an
    /// undoable was produced.
    pub fn register_undo_opt<T>(&mut self, pair: (T, Option<Undoable>)) -> UndoResult<T> {
        let (result, undoable) = pair;
        if let Some(undoable) = undoable {
            self.register_undoable(undoable)?;
        }
        Ok(result)
    }

    /// Why registration is currently dropped, if it is.
    fn suppression(&self) -> Option<&'static str> {
        if self.undoing {
            Some("undoing")
        } else if self.redoing {
            Some("redoing")
        } else if self.disabled > 0 {
            Some("disabled")
        } else {
            None
        }
    }

    fn register(&mut self, action: Action) -> UndoResult {
        if let Some(reason) = self.suppression() {
            tracing::debug!(
                target: "undo.history",
                description = action.description(),
                reason,
                "registration suppressed"
            );
            return Ok(());
        }
        self.record(action).map(drop)
    }

    /// Route an action into the innermost open group, or commit it at the
    /// top level. Returns what a top-level commit displaced.
    fn record(&mut self, action: Action) -> UndoResult<Option<Displaced>> {
        if self.pending.is_empty() {
            return Ok(Some(self.commit(action)));
        }
        let level = self.pending.len();
        let group = self
            .pending
            .innermost_mut(&mut self.changes)
            .ok_or(UndoError::Inconsistent("open group missing from history"))?;
        tracing::debug!(
            target: "undo.history",
            description = action.description(),
            group = group.description(),
            level,
            "registered into group"
        );
        group.push(action);
        Ok(None)
    }

    /// Append a top-level entry after the cursor.
    fn commit(&mut self, action: Action) -> Displaced {
        // Clear redo tail (new branch)
        let cursor = self.applied.min(self.changes.len());
        let redo_tail = self.changes.split_off(cursor);
        self.applied = cursor;
        if !redo_tail.is_empty() {
            tracing::debug!(
                target: "undo.history",
                discarded = redo_tail.len(),
                "redo tail discarded"
            );
        }

        // Enforce depth limit
        let mut evicted = Vec::new();
        let cap = self.config.levels_of_undo;
        while cap > 0 && self.changes.len() >= cap {
            let Some(oldest) = self.changes.pop_front() else {
                break;
            };
            self.applied = self.applied.saturating_sub(1);
            tracing::trace!(
                target: "undo.history",
                description = oldest.description(),
                levels_of_undo = cap,
                "evicted oldest entry"
            );
            evicted.push(oldest);
        }

        let description = action.description().to_string();
        let performed = action.is_done();
        self.changes.push_back(action);
        self.applied += 1;
        tracing::debug!(
            target: "undo.history",
            description = %description,
            state_index = self.state_index(),
            len = self.changes.len(),
            "committed"
        );

        // Opening groups announce themselves via `GroupOpened` instead.
        if performed {
            self.observers.emit(&UndoEvent::GroupClosed {
                description,
                level: 0,
            });
        }

        Displaced { redo_tail, evicted }
    }

    // ========================================================================
    // Grouping
    // ========================================================================

    /// Number of open groups.
    #[must_use]
    pub fn grouping_level(&self) -> usize {
        self.pending.len()
    }

    /// Open a group. Everything registered until the matching
    /// [`end_group`](Self::end_group) becomes one history entry.
    ///
    /// The group takes its place in history immediately (discarding any redo
    /// tail). While registration is suppressed the group is opened outside
    /// history, so its contents are never recorded.
    pub fn begin_group(&mut self, description: impl Into<String>) -> UndoResult {
        let description = description.into();
        let frame = match self.suppression() {
            Some(reason) => {
                tracing::debug!(
                    target: "undo.group",
                    description = %description,
                    reason,
                    "group opened outside history"
                );
                GroupFrame::detached(description.clone())
            }
            None => {
                let displaced = self.record(Action::Group(GroupAction::new(description.clone())))?;
                GroupFrame::attached(description.clone(), displaced)
            }
        };
        self.pending.push(frame);

        let level = self.pending.len();
        tracing::debug!(target: "undo.group", description = %description, level, "group opened");
        self.observers.emit(&UndoEvent::Checkpoint);
        self.observers
            .emit(&UndoEvent::GroupOpened { description, level });
        Ok(())
    }

    /// Open a group labelled with the configured default description.
    pub fn begin_default_group(&mut self) -> UndoResult {
        let description = self.config.default_group_description.clone();
        self.begin_group(description)
    }

    /// Close the innermost open group, committing its contents.
    pub fn end_group(&mut self) -> UndoResult {
        if self.pending.is_empty() {
            tracing::warn!(target: "undo.group", "end_group without an open group");
            return Err(Precondition::NoOpenGroup.into());
        }
        self.pending
            .innermost_mut(&mut self.changes)
            .ok_or(UndoError::Inconsistent("open group missing from history"))?
            .set_done(true);
        let frame = self
            .pending
            .pop()
            .ok_or(UndoError::Inconsistent("grouping stack emptied"))?;

        let level = self.pending.len();
        tracing::debug!(
            target: "undo.group",
            description = %frame.description,
            level,
            "group closed"
        );
        self.observers.emit(&UndoEvent::Checkpoint);
        self.observers.emit(&UndoEvent::GroupClosed {
            description: frame.description,
            level,
        });
        Ok(())
    }

    /// Roll back the innermost open group and remove it without a trace.
    ///
    /// Nested actions are reversed in reverse registration order. For a
    /// top-level group, whatever opening it discarded (redo tail, evicted
    /// entries) is put back, so history is exactly as before
    /// [`begin_group`](Self::begin_group).
    pub fn cancel_group(&mut self) -> UndoResult {
        if self.pending.is_empty() {
            tracing::warn!(target: "undo.group", "cancel_group without an open group");
            return Err(Precondition::NoOpenGroup.into());
        }
        let group = self
            .pending
            .innermost_mut(&mut self.changes)
            .ok_or(UndoError::Inconsistent("open group missing from history"))?;
        if group.is_done() {
            return Err(Precondition::GroupNotPending {
                description: group.description().to_string(),
            }
            .into());
        }
        group.set_done(true);
        self.undoing = true;
        let rollback = group.undo();
        self.undoing = false;
        if let Err(err) = rollback {
            group.set_done(false);
            tracing::warn!(target: "undo.group", error = %err, "group rollback failed");
            return Err(err);
        }

        let frame = self
            .pending
            .pop()
            .ok_or(UndoError::Inconsistent("grouping stack emptied"))?;
        if let Slot::Attached(displaced) = frame.slot {
            if self.pending.is_empty() {
                self.changes.pop_back();
                self.applied = self.applied.saturating_sub(1);
                if let Some(displaced) = displaced {
                    self.restore(displaced);
                }
            } else {
                self.pending
                    .innermost_mut(&mut self.changes)
                    .ok_or(UndoError::Inconsistent("parent group missing from history"))?
                    .pop();
            }
        }

        let level = self.pending.len();
        tracing::debug!(
            target: "undo.group",
            description = %frame.description,
            level,
            "group cancelled"
        );
        self.observers.emit(&UndoEvent::GroupCancelled {
            description: frame.description,
            level,
        });
        Ok(())
    }

    /// Put back what a cancelled top-level group displaced.
    fn restore(&mut self, displaced: Displaced) {
        let Displaced { redo_tail, evicted } = displaced;
        self.applied += evicted.len();
        for action in evicted.into_iter().rev() {
            self.changes.push_front(action);
        }
        self.changes.extend(redo_tail);
    }

    /// Run `block` inside a group.
    pub fn group<R>(
        &mut self,
        description: impl Into<String>,
        block: impl FnOnce(&mut Self) -> R,
    ) -> UndoResult<R> {
        self.begin_group(description)?;
        let result = block(self);
        self.end_group()?;
        Ok(result)
    }

    /// Run `block` inside a group, keeping the group only if it returns `true`.
    ///
    /// On `false` the group is cancelled. Returns what `block` returned.
    pub fn group_if(
        &mut self,
        description: impl Into<String>,
        block: impl FnOnce(&mut Self) -> bool,
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

    // ========================================================================
    // Undo / Redo
    // ========================================================================

    /// Undo the entry at the cursor.
    ///
    /// Any open groups are closed first, so undo always works on committed
    /// history.
    pub fn undo(&mut self) -> UndoResult {
        while !self.pending.is_empty() {
            self.end_group()?;
        }
        let Some(index) = self.applied.checked_sub(1) else {
            tracing::warn!(target: "undo.replay", "undo with nothing to undo");
            return Err(Precondition::NothingToUndo.into());
        };
        let description = self.description_at(index)?;

        self.observers.emit(&UndoEvent::WillUndo {
            description: description.clone(),
        });
        let start = Instant::now();
        let _span = tracing::debug_span!(
            "undo.undo",
            description = %description,
            state_index = index,
            duration_us = tracing::field::Empty,
        )
        .entered();

        self.undoing = true;
        let result = match self.changes.get_mut(index) {
            Some(action) => action.undo(),
            None => Err(UndoError::Inconsistent("cursor past end of history")),
        };
        self.undoing = false;
        if let Err(err) = result {
            tracing::warn!(target: "undo.replay", error = %err, "undo failed");
            return Err(err);
        }
        self.applied = index;

        let duration_us = start.elapsed().as_micros() as u64;
        tracing::Span::current().record("duration_us", duration_us);
        tracing::debug!(
            target: "undo.replay",
            description = %description,
            state_index = self.state_index(),
            duration_us,
            "undo applied"
        );
        self.observers.emit(&UndoEvent::DidUndo { description });
        Ok(())
    }

    /// Redo the entry after the cursor.
    pub fn redo(&mut self) -> UndoResult {
        let index = self.applied;
        if index >= self.changes.len() {
            tracing::warn!(target: "undo.replay", "redo with nothing to redo");
            return Err(Precondition::NothingToRedo.into());
        }
        let description = self.description_at(index)?;

        self.observers.emit(&UndoEvent::WillRedo {
            description: description.clone(),
        });
        let start = Instant::now();
        let _span = tracing::debug_span!(
            "undo.redo",
            description = %description,
            state_index = index,
            duration_us = tracing::field::Empty,
        )
        .entered();

        self.redoing = true;
        let result = match self.changes.get_mut(index) {
            Some(action) => action.redo(),
            None => Err(UndoError::Inconsistent("cursor past end of history")),
        };
        self.redoing = false;
        if let Err(err) = result {
            tracing::warn!(target: "undo.replay", error = %err, "redo failed");
            return Err(err);
        }
        self.applied = index + 1;

        let duration_us = start.elapsed().as_micros() as u64;
        tracing::Span::current().record("duration_us", duration_us);
        tracing::debug!(
            target: "undo.replay",
            description = %description,
            state_index = self.state_index(),
            duration_us,
            "redo applied"
        );
        self.observers.emit(&UndoEvent::DidRedo { description });
        Ok(())
    }

    /// Undo a group nested inside a currently open group.
    ///
    /// Not supported: always returns [`UndoError::Unsupported`].
    pub fn undo_nested_group(&mut self) -> UndoResult {
        tracing::warn!(
            target: "undo.replay",
            level = self.pending.len(),
            "undo_nested_group is not supported"
        );
        Err(UndoError::Unsupported("undo_nested_group"))
    }

    fn description_at(&self, index: usize) -> UndoResult<String> {
        self.changes
            .get(index)
            .map(|action| action.description().to_string())
            .ok_or(UndoError::Inconsistent("cursor past end of history"))
    }

    /// Check if undo is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    /// Check if redo is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.applied < self.changes.len()
    }

    /// True only while an undo is replaying.
    #[must_use]
    pub fn is_undoing(&self) -> bool {
        self.undoing
    }

    /// True only while a redo is replaying.
    #[must_use]
    pub fn is_redoing(&self) -> bool {
        self.redoing
    }

    // ========================================================================
    // Info
    // ========================================================================

    /// Index of the most recently applied entry, `-1` if none.
    #[must_use]
    pub fn state_index(&self) -> isize {
        self.applied as isize - 1
    }

    /// Number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether history has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of entries that can be undone.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.applied
    }

    /// Number of entries that can be redone.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.changes.len() - self.applied
    }

    /// Label of the entry the next undo would reverse, or `""`.
    #[must_use]
    pub fn undo_description(&self) -> &str {
        self.applied
            .checked_sub(1)
            .and_then(|index| self.changes.get(index))
            .map_or("", Action::description)
    }

    /// Label of the entry the next redo would re-apply, or `""`.
    #[must_use]
    pub fn redo_description(&self) -> &str {
        self.changes
            .get(self.applied)
            .map_or("", Action::description)
    }

    /// Labels of undoable entries, next undo first.
    pub fn undo_descriptions(&self, limit: usize) -> Vec<&str> {
        self.changes
            .iter()
            .take(self.applied)
            .rev()
            .take(limit)
            .map(Action::description)
            .collect()
    }

    /// Labels of redoable entries, next redo first.
    pub fn redo_descriptions(&self, limit: usize) -> Vec<&str> {
        self.changes
            .iter()
            .skip(self.applied)
            .take(limit)
            .map(Action::description)
            .collect()
    }

    /// Labels of all top-level entries, oldest first.
    pub fn descriptions(&self) -> Vec<&str> {
        self.changes.iter().map(Action::description).collect()
    }

    /// Top-level entries, oldest first.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.changes.iter()
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// History cap (0 = unbounded).
    #[must_use]
    pub fn levels_of_undo(&self) -> usize {
        self.config.levels_of_undo
    }

    /// Change the history cap. A lower cap takes effect at the next
    /// top-level registration.
    pub fn set_levels_of_undo(&mut self, levels: usize) {
        self.config.levels_of_undo = levels;
    }

    /// Stop recording until a matching [`enable_registration`](Self::enable_registration).
    ///
    /// Calls nest: registration resumes once every disable is balanced.
    pub fn disable_registration(&mut self) {
        self.disabled += 1;
        tracing::debug!(target: "undo.history", depth = self.disabled, "registration disabled");
    }

    /// Balance one [`disable_registration`](Self::disable_registration).
    pub fn enable_registration(&mut self) -> UndoResult {
        if self.disabled == 0 {
            return Err(Precondition::RegistrationNotDisabled.into());
        }
        self.disabled -= 1;
        tracing::debug!(target: "undo.history", depth = self.disabled, "registration enabled");
        Ok(())
    }

    /// Whether registrations are currently recorded.
    #[must_use]
    pub fn is_registration_enabled(&self) -> bool {
        self.disabled == 0
    }

    // ========================================================================
    // Observers
    // ========================================================================

    /// Register a callback for lifecycle events.
    pub fn subscribe(&mut self, callback: impl FnMut(&UndoEvent) + Send + 'static) -> ObserverId {
        self.observers.subscribe(callback)
    }

    /// Remove a callback. Returns `false` if the id was unknown.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Clear all history and open groups; the cursor returns to `-1`.
    pub fn reset(&mut self) {
        let dropped = self.changes.len();
        self.changes.clear();
        self.pending.clear();
        self.applied = 0;
        tracing::debug!(target: "undo.history", dropped, "history reset");
        self.observers.emit(&UndoEvent::Checkpoint);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    type Log = Arc<Mutex<Vec<String>>>;

    fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().clone()
    }

    /// Register a change that sets `x` to `to`, assuming the previous value
    /// was `from`. The forward effect is applied first.
    fn set(mgr: &mut UndoManager, x: &Arc<AtomicI64>, from: i64, to: i64) {
        let fwd = x.clone();
        let bwd = x.clone();
        mgr.perform_change(
            format!("set x={to}"),
            move || fwd.store(to, Ordering::SeqCst),
            move || bwd.store(from, Ordering::SeqCst),
        )
        .unwrap();
    }

    /// Register a change that only writes to a log.
    fn logged(mgr: &mut UndoManager, log: &Log, name: &str) {
        let fwd = log.clone();
        let bwd = log.clone();
        let (redo, undo) = (format!("{name}.redo"), format!("{name}.undo"));
        mgr.register_change(
            name,
            move || fwd.lock().push(redo.clone()),
            move || bwd.lock().push(undo.clone()),
        )
        .unwrap();
    }

    fn counter_step(counter: Arc<AtomicI64>, up: bool) -> Undoable {
        let label = if up { "increment" } else { "decrement" };
        Undoable::new(label, move || {
            if up {
                counter.fetch_sub(1, Ordering::SeqCst);
            } else {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            counter_step(counter, !up)
        })
    }

    fn x() -> Arc<AtomicI64> {
        Arc::new(AtomicI64::new(0))
    }

    #[test]
    fn test_new_manager() {
        let mgr = UndoManager::default();
        assert!(!mgr.can_undo());
        assert!(!mgr.can_redo());
        assert_eq!(mgr.state_index(), -1);
        assert_eq!(mgr.len(), 0);
        assert!(mgr.is_empty());
        assert_eq!(mgr.grouping_level(), 0);
        assert_eq!(mgr.undo_description(), "");
        assert_eq!(mgr.redo_description(), "");
        assert!(mgr.is_registration_enabled());
    }

    #[test]
    fn test_set_x_scenario() {
        let mut mgr = UndoManager::default();
        let x = x();
        set(&mut mgr, &x, 0, 1);
        assert_eq!(x.load(Ordering::SeqCst), 1);
        assert!(mgr.can_undo());
        assert!(!mgr.can_redo());

        mgr.undo().unwrap();
        assert_eq!(x.load(Ordering::SeqCst), 0);
        assert!(!mgr.can_undo());
        assert!(mgr.can_redo());

        mgr.redo().unwrap();
        assert_eq!(x.load(Ordering::SeqCst), 1);
        assert!(mgr.can_undo());
        assert!(!mgr.can_redo());
        assert_eq!(mgr.state_index(), 0);
    }

    #[test]
    fn test_registration_keeps_cursor_at_end() {
        let mut mgr = UndoManager::default();
        let x = x();
        for i in 0..5 {
            set(&mut mgr, &x, i, i + 1);
            assert_eq!(mgr.state_index(), mgr.len() as isize - 1);
            assert!(!mgr.can_redo());
        }
    }

    #[test]
    fn test_register_truncates_redo_tail() {
        let mut mgr = UndoManager::default();
        let x = x();
        set(&mut mgr, &x, 0, 1);
        set(&mut mgr, &x, 1, 2);
        set(&mut mgr, &x, 2, 3);
        mgr.undo().unwrap();
        mgr.undo().unwrap();
        assert_eq!(mgr.redo_depth(), 2);

        set(&mut mgr, &x, 1, 10);
        assert_eq!(mgr.descriptions(), vec!["set x=1", "set x=10"]);
        assert_eq!(mgr.state_index(), 1);
        assert!(!mgr.can_redo());
    }

    #[test]
    fn test_levels_of_undo_evicts_oldest() {
        let mut mgr = UndoManager::new(UndoConfig::new(3));
        let x = x();
        for i in 0..5 {
            set(&mut mgr, &x, i, i + 1);
        }
        assert_eq!(mgr.len(), 3);
        assert_eq!(mgr.state_index(), 2);
        assert_eq!(mgr.descriptions(), vec!["set x=3", "set x=4", "set x=5"]);
    }

    #[test]
    fn test_lowered_cap_applies_on_next_registration() {
        let mut mgr = UndoManager::default();
        let x = x();
        for i in 0..6 {
            set(&mut mgr, &x, i, i + 1);
        }
        mgr.set_levels_of_undo(2);
        assert_eq!(mgr.levels_of_undo(), 2);
        assert_eq!(mgr.len(), 6);

        set(&mut mgr, &x, 6, 7);
        assert_eq!(mgr.descriptions(), vec!["set x=6", "set x=7"]);
        assert_eq!(mgr.state_index(), 1);
    }

    #[test]
    fn test_undo_with_empty_history_is_precondition() {
        let mut mgr = UndoManager::default();
        let err = mgr.undo().unwrap_err();
        assert_eq!(err.precondition(), Some(&Precondition::NothingToUndo));
        let err = mgr.redo().unwrap_err();
        assert_eq!(err.precondition(), Some(&Precondition::NothingToRedo));
    }

    #[test]
    fn test_group_undoes_as_one_step() {
        let mut mgr = UndoManager::default();
        let log = new_log();
        mgr.begin_group("move+resize").unwrap();
        logged(&mut mgr, &log, "move");
        logged(&mut mgr, &log, "resize");
        mgr.end_group().unwrap();

        assert_eq!(mgr.len(), 1);
        assert_eq!(mgr.undo_description(), "move+resize");
        mgr.undo().unwrap();
        assert_eq!(entries(&log), vec!["resize.undo", "move.undo"]);
        assert!(!mgr.can_undo());

        mgr.redo().unwrap();
        assert_eq!(
            entries(&log),
            vec!["resize.undo", "move.undo", "move.redo", "resize.redo"]
        );
    }

    #[test]
    fn test_group_occupies_slot_while_open() {
        let mut mgr = UndoManager::default();
        mgr.begin_group("open").unwrap();
        assert_eq!(mgr.len(), 1);
        assert_eq!(mgr.state_index(), 0);
        assert_eq!(mgr.grouping_level(), 1);
        assert!(!mgr.actions().next().unwrap().is_done());

        mgr.end_group().unwrap();
        assert!(mgr.actions().next().unwrap().is_done());
        assert_eq!(mgr.grouping_level(), 0);
    }

    #[test]
    fn test_nested_groups_form_one_entry() {
        let mut mgr = UndoManager::default();
        let log = new_log();
        mgr.begin_group("outer").unwrap();
        logged(&mut mgr, &log, "a");
        mgr.begin_group("inner").unwrap();
        logged(&mut mgr, &log, "b");
        assert_eq!(mgr.grouping_level(), 2);
        mgr.end_group().unwrap();
        logged(&mut mgr, &log, "c");
        mgr.end_group().unwrap();

        assert_eq!(mgr.len(), 1);
        let outer = mgr.actions().next().unwrap().as_group().unwrap();
        let kinds: Vec<_> = outer.nested().map(Action::kind).collect();
        assert_eq!(
            kinds,
            vec![ActionKind::Standard, ActionKind::Group, ActionKind::Standard]
        );

        mgr.undo().unwrap();
        assert_eq!(entries(&log), vec!["c.undo", "b.undo", "a.undo"]);
    }

    #[test]
    fn test_undo_closes_open_groups() {
        let mut mgr = UndoManager::default();
        let log = new_log();
        mgr.begin_group("outer").unwrap();
        mgr.begin_group("inner").unwrap();
        logged(&mut mgr, &log, "a");

        mgr.undo().unwrap();
        assert_eq!(mgr.grouping_level(), 0);
        assert_eq!(entries(&log), vec!["a.undo"]);
        assert_eq!(mgr.redo_description(), "outer");
    }

    #[test]
    fn test_end_group_without_open_group() {
        let mut mgr = UndoManager::default();
        assert_eq!(
            mgr.end_group().unwrap_err().precondition(),
            Some(&Precondition::NoOpenGroup)
        );
        assert_eq!(
            mgr.cancel_group().unwrap_err().precondition(),
            Some(&Precondition::NoOpenGroup)
        );
    }

    #[test]
    fn test_cancel_group_restores_history() {
        let mut mgr = UndoManager::default();
        let x = x();
        set(&mut mgr, &x, 0, 1);
        set(&mut mgr, &x, 1, 2);
        mgr.undo().unwrap();
        let before = (mgr.descriptions().join(","), mgr.state_index());

        mgr.begin_group("doomed").unwrap();
        set(&mut mgr, &x, 1, 5);
        set(&mut mgr, &x, 5, 7);
        assert_eq!(x.load(Ordering::SeqCst), 7);
        mgr.cancel_group().unwrap();

        assert_eq!(x.load(Ordering::SeqCst), 1);
        assert_eq!((mgr.descriptions().join(","), mgr.state_index()), before);
        assert!(mgr.can_redo());
        mgr.redo().unwrap();
        assert_eq!(x.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cancel_group_restores_evicted_entries() {
        let mut mgr = UndoManager::new(UndoConfig::new(2));
        let x = x();
        set(&mut mgr, &x, 0, 1);
        set(&mut mgr, &x, 1, 2);

        mgr.begin_group("doomed").unwrap();
        assert_eq!(mgr.descriptions(), vec!["set x=2", "doomed"]);
        mgr.cancel_group().unwrap();

        assert_eq!(mgr.descriptions(), vec!["set x=1", "set x=2"]);
        assert_eq!(mgr.state_index(), 1);
    }

    #[test]
    fn test_cancel_nested_group_removes_it_from_parent() {
        let mut mgr = UndoManager::default();
        let log = new_log();
        mgr.begin_group("outer").unwrap();
        logged(&mut mgr, &log, "a");
        mgr.begin_group("inner").unwrap();
        logged(&mut mgr, &log, "b");
        logged(&mut mgr, &log, "c");
        mgr.cancel_group().unwrap();
        assert_eq!(entries(&log), vec!["c.undo", "b.undo"]);
        assert_eq!(mgr.grouping_level(), 1);

        logged(&mut mgr, &log, "d");
        mgr.end_group().unwrap();

        let outer = mgr.actions().next().unwrap().as_group().unwrap();
        let names: Vec<_> = outer.nested().map(Action::description).collect();
        assert_eq!(names, vec!["a", "d"]);
    }

    #[test]
    fn test_dynamic_scenario() {
        let mut mgr = UndoManager::default();
        let counter = Arc::new(AtomicI64::new(1));
        mgr.register_undoable(counter_step(counter.clone(), true))
            .unwrap();
        assert_eq!(mgr.undo_description(), "increment");

        mgr.undo().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(mgr.redo_description(), "decrement");

        mgr.redo().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(mgr.undo_description(), "increment");
    }

    #[test]
    fn test_register_undo_helpers() {
        let mut mgr = UndoManager::default();
        let counter = Arc::new(AtomicI64::new(1));
        let value = mgr
            .register_undo(("ok", counter_step(counter.clone(), true)))
            .unwrap();
        assert_eq!(value, "ok");
        assert_eq!(mgr.len(), 1);

        let value = mgr.register_undo_opt((3, None)).unwrap();
        assert_eq!(value, 3);
        assert_eq!(mgr.len(), 1);

        mgr.register_undo_opt(((), Some(counter_step(counter, true))))
            .unwrap();
        assert_eq!(mgr.len(), 2);
    }

    #[test]
    fn test_disabled_registration_is_noop() {
        let mut mgr = UndoManager::default();
        let x = x();
        mgr.disable_registration();
        mgr.disable_registration();
        set(&mut mgr, &x, 0, 1);
        mgr.enable_registration().unwrap();
        set(&mut mgr, &x, 1, 2);
        assert!(mgr.is_empty());

        mgr.enable_registration().unwrap();
        assert!(mgr.is_registration_enabled());
        set(&mut mgr, &x, 2, 3);
        assert_eq!(mgr.len(), 1);

        assert_eq!(
            mgr.enable_registration().unwrap_err().precondition(),
            Some(&Precondition::RegistrationNotDisabled)
        );
    }

    #[test]
    fn test_config_can_start_disabled() {
        let mut mgr = UndoManager::new(UndoConfig::default().with_registration_enabled(false));
        assert!(!mgr.is_registration_enabled());
        mgr.enable_registration().unwrap();
        assert!(mgr.is_registration_enabled());
    }

    #[test]
    fn test_group_opened_while_disabled_stays_out_of_history() {
        let mut mgr = UndoManager::default();
        let log = new_log();
        mgr.disable_registration();
        mgr.begin_group("ghost").unwrap();
        mgr.enable_registration().unwrap();
        logged(&mut mgr, &log, "a");
        assert_eq!(mgr.grouping_level(), 1);
        assert!(mgr.is_empty());

        mgr.cancel_group().unwrap();
        assert_eq!(entries(&log), vec!["a.undo"]);
        assert!(mgr.is_empty());
        assert_eq!(mgr.state_index(), -1);
    }

    #[test]
    fn test_group_helpers() {
        let mut mgr = UndoManager::default();
        let log = new_log();
        let value = mgr
            .group("both", |mgr| {
                logged(mgr, &log, "a");
                logged(mgr, &log, "b");
                42
            })
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(mgr.len(), 1);

        let kept = mgr
            .group_if("rejected", |mgr| {
                logged(mgr, &log, "c");
                false
            })
            .unwrap();
        assert!(!kept);
        assert_eq!(mgr.len(), 1);
        assert_eq!(entries(&log), vec!["c.undo"]);

        let kept = mgr
            .group_if("accepted", |mgr| {
                logged(mgr, &log, "d");
                true
            })
            .unwrap();
        assert!(kept);
        assert_eq!(mgr.descriptions(), vec!["both", "accepted"]);
    }

    #[test]
    fn test_begin_default_group() {
        let mut mgr =
            UndoManager::new(UndoConfig::default().with_default_group_description("Batch"));
        mgr.begin_default_group().unwrap();
        mgr.end_group().unwrap();
        assert_eq!(mgr.undo_description(), "Batch");
    }

    #[test]
    fn test_undo_nested_group_is_unsupported() {
        let mut mgr = UndoManager::default();
        mgr.begin_group("outer").unwrap();
        let err = mgr.undo_nested_group().unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(mgr.grouping_level(), 1);
    }

    #[test]
    fn test_events_fire_in_order() {
        let mut mgr = UndoManager::default();
        let seen = new_log();
        let sink = seen.clone();
        mgr.subscribe(move |e| sink.lock().push(e.name().to_string()));
        let log = new_log();

        mgr.begin_group("g").unwrap();
        logged(&mut mgr, &log, "a");
        mgr.end_group().unwrap();
        mgr.undo().unwrap();
        mgr.redo().unwrap();
        logged(&mut mgr, &log, "b");
        mgr.reset();

        assert_eq!(
            entries(&seen),
            vec![
                "checkpoint",
                "group_opened",
                "checkpoint",
                "group_closed",
                "will_undo",
                "did_undo",
                "will_redo",
                "did_redo",
                "group_closed",
                "checkpoint",
            ]
        );
    }

    #[test]
    fn test_cancel_emits_group_cancelled() {
        let mut mgr = UndoManager::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        mgr.subscribe(move |e| sink.lock().push(e.clone()));
        let log = new_log();

        mgr.begin_group("outer").unwrap();
        mgr.begin_group("inner").unwrap();
        logged(&mut mgr, &log, "a");
        mgr.cancel_group().unwrap();
        mgr.cancel_group().unwrap();

        let names: Vec<_> = seen.lock().iter().map(UndoEvent::name).collect();
        assert_eq!(
            names,
            vec![
                "checkpoint",
                "group_opened",
                "checkpoint",
                "group_opened",
                "group_cancelled",
                "group_cancelled",
            ]
        );
        assert_eq!(
            seen.lock()[4],
            UndoEvent::GroupCancelled {
                description: "inner".into(),
                level: 1,
            }
        );
        assert_eq!(
            seen.lock()[5],
            UndoEvent::GroupCancelled {
                description: "outer".into(),
                level: 0,
            }
        );
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_unsubscribe_stops_events() {
        let mut mgr = UndoManager::default();
        let seen = new_log();
        let sink = seen.clone();
        let id = mgr.subscribe(move |e| sink.lock().push(e.name().to_string()));
        assert!(mgr.unsubscribe(id));
        mgr.reset();
        assert!(entries(&seen).is_empty());
    }

    #[test]
    fn test_reset() {
        let mut mgr = UndoManager::default();
        let x = x();
        set(&mut mgr, &x, 0, 1);
        mgr.begin_group("open").unwrap();
        mgr.reset();
        assert!(mgr.is_empty());
        assert_eq!(mgr.state_index(), -1);
        assert_eq!(mgr.grouping_level(), 0);
        assert!(!mgr.can_undo());
        // Reset forgets history but not the world.
        assert_eq!(x.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_descriptions_limited() {
        let mut mgr = UndoManager::default();
        let x = x();
        for i in 0..4 {
            set(&mut mgr, &x, i, i + 1);
        }
        mgr.undo().unwrap();
        assert_eq!(mgr.undo_descriptions(2), vec!["set x=3", "set x=2"]);
        assert_eq!(mgr.redo_descriptions(5), vec!["set x=4"]);
        assert_eq!(mgr.undo_depth(), 3);
        assert_eq!(mgr.redo_depth(), 1);
    }

    #[test]
    fn test_flags_are_clear_outside_replay() {
        let mut mgr = UndoManager::default();
        let x = x();
        set(&mut mgr, &x, 0, 1);
        mgr.undo().unwrap();
        assert!(!mgr.is_undoing());
        mgr.redo().unwrap();
        assert!(!mgr.is_redoing());
    }

    #[test]
    fn test_manager_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<UndoManager>();
    }

    #[test]
    fn test_debug_impl() {
        let mgr = UndoManager::default();
        let debug_str = format!("{:?}", mgr);
        assert!(debug_str.contains("UndoManager"));
        assert!(debug_str.contains("state_index"));
    }
}
