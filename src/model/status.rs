//! Per-secret change status and its transition table.
//!
//! A status lives only for the duration of one edit session. Every
//! user intent is routed through `ChangeStatus::apply`, which either
//! yields the next status, asks for the secret to be dropped from the
//! working sequence, or rejects the intent outright.

use std::fmt;

/// Where a secret stands relative to the last-known remote state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChangeStatus {
    /// Unchanged since the session began.
    #[default]
    None,
    /// New secret, not yet sent to the store.
    Created,
    /// Existing secret whose value was edited.
    Modified,
    /// Tombstone: hidden from the user, deleted on the next save.
    Deleted,
    /// Existing secret from elsewhere, to be attached to this repository.
    Added,
}

/// A user intent that may change a secret's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    EditValue,
    EditKey,
    Delete,
}

/// Result of applying a `ChangeEvent` to a `ChangeStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The secret stays in the sequence with this status.
    Become(ChangeStatus),
    /// The secret was never transmitted; drop it from the sequence.
    Remove,
}

impl ChangeStatus {
    /// Apply `event` to this status.
    ///
    /// Returns `None` when the transition is illegal (for example any
    /// edit of a tombstoned secret).
    pub fn apply(self, event: ChangeEvent) -> Option<Transition> {
        use ChangeEvent::{Delete, EditKey, EditValue};
        use ChangeStatus::{Added, Created, Deleted, Modified, None as Unchanged};

        match (self, event) {
            (Unchanged | Modified, EditValue) => Some(Transition::Become(Modified)),
            (Created, EditValue) => Some(Transition::Become(Created)),
            (Added | Deleted, EditValue) => None,

            // Renaming never changes the status on its own.
            (Unchanged | Created | Modified, EditKey) => Some(Transition::Become(self)),
            (Added | Deleted, EditKey) => None,

            (Unchanged | Modified | Deleted, Delete) => Some(Transition::Become(Deleted)),
            (Created | Added, Delete) => Some(Transition::Remove),
        }
    }

    /// Whether a secret with this status still has a remote call pending.
    pub fn is_pending(self) -> bool {
        self != Self::None
    }

    /// Short label for tables and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Created => "Created",
            Self::Modified => "Modified",
            Self::Deleted => "Deleted",
            Self::Added => "Added",
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::EditValue => "edit the value of",
            Self::EditKey => "rename",
            Self::Delete => "delete",
        };
        f.write_str(verb)
    }
}
