//! The `Repository` entity and url-based hosting detection.

use std::fmt;

use super::secret::{Secret, SecretHandle};
use super::status::ChangeStatus;

/// Id carried by entities that have not been persisted yet.
pub const UNSAVED_ID: i64 = 0;

/// A source repository and the secrets attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Server id, or `UNSAVED_ID` for a repository being added.
    pub id: i64,

    /// Clone url (e.g. "git@github.com:acme/api.git"). Unique per store.
    pub url: String,

    /// Secrets in display order, including tombstones.
    pub secrets: Vec<Secret>,

    /// `true` until the repository has been created remotely.
    pub is_new: bool,
}

impl Repository {
    /// A fresh, empty repository for the "add" flow.
    pub fn new_unsaved() -> Self {
        Self {
            id: UNSAVED_ID,
            url: String::new(),
            secrets: Vec::new(),
            is_new: true,
        }
    }

    /// A repository as fetched from the store.
    pub fn persisted(id: i64, url: impl Into<String>, secrets: Vec<Secret>) -> Self {
        Self {
            id,
            url: url.into(),
            secrets,
            is_new: false,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id != UNSAVED_ID
    }

    pub fn kind(&self) -> RepositoryKind {
        RepositoryKind::detect(&self.url)
    }

    pub fn secret(&self, handle: SecretHandle) -> Option<&Secret> {
        self.secrets.iter().find(|s| s.handle == handle)
    }

    pub fn secret_mut(&mut self, handle: SecretHandle) -> Option<&mut Secret> {
        self.secrets.iter_mut().find(|s| s.handle == handle)
    }

    /// Remove a secret by identity. Returns `true` if it was present.
    pub fn remove_secret(&mut self, handle: SecretHandle) -> bool {
        let before = self.secrets.len();
        self.secrets.retain(|s| s.handle != handle);
        self.secrets.len() != before
    }

    /// Secrets the user can see (tombstones are hidden).
    pub fn visible_secrets(&self) -> impl Iterator<Item = &Secret> {
        self.secrets.iter().filter(|s| !s.is_deleted())
    }

    /// First visible secret with the given key.
    pub fn find_by_key(&self, key: &str) -> Option<&Secret> {
        self.visible_secrets().find(|s| s.secret_key == key)
    }

    /// Number of secrets carrying each pending status.
    pub fn pending_counts(&self) -> PendingCounts {
        let mut counts = PendingCounts::default();
        for secret in &self.secrets {
            match secret.status() {
                ChangeStatus::None => {}
                ChangeStatus::Created => counts.created += 1,
                ChangeStatus::Modified => counts.modified += 1,
                ChangeStatus::Deleted => counts.deleted += 1,
                ChangeStatus::Added => counts.attached += 1,
            }
        }
        counts
    }
}

/// Tally of pending secret changes in a working copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingCounts {
    pub created: usize,
    pub modified: usize,
    pub deleted: usize,
    pub attached: usize,
}

impl PendingCounts {
    pub fn total(&self) -> usize {
        self.created + self.modified + self.deleted + self.attached
    }
}

impl fmt::Display for PendingCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} modified, {} deleted, {} attached",
            self.created, self.modified, self.deleted, self.attached
        )
    }
}

/// Hosting service inferred from a repository url.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryKind {
    GitHub,
    GitLab,
    Bitbucket,
    Other,
}

impl RepositoryKind {
    /// Detect the host from an http(s) or `git@` url.
    pub fn detect(url: &str) -> Self {
        let host = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"))
            .or_else(|| url.strip_prefix("git@"))
            .unwrap_or(url);

        if host.starts_with("github.com") {
            Self::GitHub
        } else if host.starts_with("gitlab.com") {
            Self::GitLab
        } else if host.starts_with("bitbucket.org") {
            Self::Bitbucket
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GitHub => "GitHub",
            Self::GitLab => "GitLab",
            Self::Bitbucket => "Bitbucket",
            Self::Other => "-",
        };
        f.write_str(name)
    }
}
