#![forbid(unsafe_code)]

//! Lifecycle notifications.
//!
//! The manager fires [`UndoEvent`]s synchronously at fixed points so a host
//! can refresh menu titles or flush UI checkpoints. Observers are plain
//! callbacks kept in registration order; the manager does not know who
//! listens.
//!
//! | Operation        | Events (in order)                      |
//! |------------------|----------------------------------------|
//! | top-level commit | `GroupClosed { level: 0 }`             |
//! | `begin_group`    | `Checkpoint`, `GroupOpened`            |
//! | `end_group`      | `Checkpoint`, `GroupClosed`            |
//! | `cancel_group`   | `GroupCancelled`                       |
//! | `undo`           | (`end_group` events)*, `WillUndo`, `DidUndo` |
//! | `redo`           | `WillRedo`, `DidRedo`                  |
//! | `reset`          | `Checkpoint`                           |

use std::fmt;

/// A notification fired by an [`UndoManager`](crate::UndoManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoEvent {
    /// An undo is about to run.
    WillUndo { description: String },
    /// An undo completed.
    DidUndo { description: String },
    /// A redo is about to run.
    WillRedo { description: String },
    /// A redo completed.
    DidRedo { description: String },
    /// A group was opened; `level` is the grouping depth after opening.
    GroupOpened { description: String, level: usize },
    /// A group was closed or a top-level entry was committed; `level` is the
    /// grouping depth afterwards.
    GroupClosed { description: String, level: usize },
    /// A group was rolled back and discarded.
    GroupCancelled { description: String, level: usize },
    /// The host should flush any coalesced UI state.
    Checkpoint,
}

impl UndoEvent {
    /// Short stable name, used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::WillUndo { .. } => "will_undo",
            Self::DidUndo { .. } => "did_undo",
            Self::WillRedo { .. } => "will_redo",
            Self::DidRedo { .. } => "did_redo",
            Self::GroupOpened { .. } => "group_opened",
            Self::GroupClosed { .. } => "group_closed",
            Self::GroupCancelled { .. } => "group_cancelled",
            Self::Checkpoint => "checkpoint",
        }
    }
}

/// Handle returned by [`Observers::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

type Callback = Box<dyn FnMut(&UndoEvent) + Send>;

/// Ordered list of event callbacks.
#[derive(Default)]
pub struct Observers {
    next_id: u64,
    callbacks: Vec<(ObserverId, Callback)>,
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.callbacks.len())
            .finish()
    }
}

impl Observers {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. Callbacks run in registration order.
    pub fn subscribe(&mut self, callback: impl FnMut(&UndoEvent) + Send + 'static) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns `false` if the id was unknown.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(existing, _)| *existing != id);
        self.callbacks.len() != before
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Whether no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Deliver an event to every callback.
    pub fn emit(&mut self, event: &UndoEvent) {
        tracing::trace!(
            target: "undo.events",
            event = event.name(),
            observers = self.callbacks.len(),
            "emit"
        );
        for (_, callback) in &mut self.callbacks {
            callback(event);
        }
    }
}
