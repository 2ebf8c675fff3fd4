#![forbid(unsafe_code)]

//! The stack of groups currently being built.
//!
//! An open group is registered like any other action, so it already occupies
//! its slot in history (or in its parent group) while it is being filled.
//! Registrations always go to the innermost open group, which means every
//! open group is the *last* element of its container:
//!
//! ```text
//! changes: [a, b, G1]            frames: [G1, G2]
//!                  └─ nested: [c, G2]
//!                                  └─ nested: [d]   <- innermost
//! ```
//!
//! The stack therefore stores one [`GroupFrame`] per open group and finds
//! the innermost group by following "last element" links from the root.
//!
//! A group opened while registration is suppressed never reaches history.
//! Its frame owns the group instead ([`Slot::Detached`]); anything nested
//! below it resolves from that owned group.

use std::collections::VecDeque;

use crate::action::{Action, GroupAction};

/// What committing a top-level entry pushed out of history.
///
/// Kept by a top-level group frame so cancelling the group can put history
/// back exactly as it was before the group opened.
#[derive(Debug, Default)]
pub(crate) struct Displaced {
    /// Entries after the cursor that were truncated (oldest first).
    pub(crate) redo_tail: VecDeque<Action>,
    /// Entries evicted from the front to respect the cap (oldest first).
    pub(crate) evicted: Vec<Action>,
}

/// Where an open group lives.
#[derive(Debug)]
pub(crate) enum Slot {
    /// Last element of its container in the history tree. Top-level groups
    /// carry what their registration displaced.
    Attached(Option<Displaced>),
    /// Owned by the frame; opened while registration was suppressed.
    Detached(GroupAction),
}

/// One open group.
#[derive(Debug)]
pub(crate) struct GroupFrame {
    pub(crate) description: String,
    pub(crate) slot: Slot,
}

impl GroupFrame {
    pub(crate) fn attached(description: impl Into<String>, displaced: Option<Displaced>) -> Self {
        Self {
            description: description.into(),
            slot: Slot::Attached(displaced),
        }
    }

    pub(crate) fn detached(description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            slot: Slot::Detached(GroupAction::new(description.clone())),
            description,
        }
    }

    fn is_detached(&self) -> bool {
        matches!(self.slot, Slot::Detached(_))
    }
}

/// Stack of open groups, innermost last.
#[derive(Debug, Default)]
pub(crate) struct PendingGroups {
    frames: Vec<GroupFrame>,
}

impl PendingGroups {
    pub(crate) fn len(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub(crate) fn push(&mut self, frame: GroupFrame) {
        self.frames.push(frame);
    }

    pub(crate) fn pop(&mut self) -> Option<GroupFrame> {
        self.frames.pop()
    }

    pub(crate) fn clear(&mut self) {
        self.frames.clear();
    }

    /// Resolve the innermost open group.
    ///
    /// Returns `None` when nothing is open or when the frames no longer
    /// match the shape of `changes`.
    pub(crate) fn innermost_mut<'a>(
        &'a mut self,
        changes: &'a mut VecDeque<Action>,
    ) -> Option<&'a mut GroupAction> {
        let depth = self.frames.len();
        let root = self.frames.iter().rposition(GroupFrame::is_detached);
        let (mut group, remaining) = match root {
            Some(index) => {
                let Slot::Detached(group) = &mut self.frames[index].slot else {
                    return None;
                };
                (group, depth - index - 1)
            }
            None => {
                if depth == 0 {
                    return None;
                }
                (changes.back_mut()?.as_group_mut()?, depth - 1)
            }
        };
        for _ in 0..remaining {
            group = group.last_group_mut()?;
        }
        Some(group)
    }
}
