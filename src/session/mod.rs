//! Session module — the editable working copy and its pristine snapshot.
//!
//! An `EditSession` owns two independent copies of one repository:
//! `selected`, which the user mutates through a `ChangeTracker`, and
//! `original`, taken when the session opens and used for revert and
//! for diffing on save. The copies never share secret storage.

pub mod tracker;

pub use tracker::ChangeTracker;

use crate::model::{PendingCounts, Repository};

/// One edit session over a single repository.
#[derive(Debug, Clone)]
pub struct EditSession {
    selected: Repository,
    original: Repository,
}

impl EditSession {
    /// Open a session on an existing repository.
    ///
    /// The repository itself becomes the working copy; the snapshot is
    /// a deep clone, secrets included.
    pub fn begin(repository: Repository) -> Self {
        let original = repository.clone();
        Self {
            selected: repository,
            original,
        }
    }

    /// Open a session for a repository that does not exist yet.
    pub fn begin_new() -> Self {
        Self::begin(Repository::new_unsaved())
    }

    /// The live working copy.
    pub fn selected(&self) -> &Repository {
        &self.selected
    }

    /// The snapshot taken when the session opened.
    pub fn original(&self) -> &Repository {
        &self.original
    }

    /// Route user intents through the change tracker.
    pub fn tracker(&mut self) -> ChangeTracker<'_> {
        ChangeTracker::new(&mut self.selected)
    }

    /// Discard every edit: restore the url and the whole secret
    /// sequence (elements and order) from the snapshot.
    pub fn revert(&mut self) {
        self.selected.url = self.original.url.clone();
        self.selected.secrets = self.original.secrets.clone();
    }

    /// `true` if saving would issue at least one remote call.
    pub fn has_changes(&self) -> bool {
        self.selected.is_new
            || self.selected.url != self.original.url
            || self.selected.secrets.iter().any(|s| s.status().is_pending())
    }

    pub fn pending_changes(&self) -> PendingCounts {
        self.selected.pending_counts()
    }

    /// Close the session and hand the working copy back to the caller.
    pub fn into_selected(self) -> Repository {
        self.selected
    }

    /// Working copy (mutable) and snapshot, for the reconciliation engine.
    pub(crate) fn parts_mut(&mut self) -> (&mut Repository, &mut Repository) {
        (&mut self.selected, &mut self.original)
    }
}
