//! The `Secret` entity and its session-local identity.
//!
//! A secret's value is write-only from the client's side: it is held in
//! a `Zeroizing<String>` only while an edit is pending, and wiped as
//! soon as the store acknowledges it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use zeroize::Zeroizing;

use super::repository::UNSAVED_ID;
use super::status::ChangeStatus;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a secret inside the process.
///
/// Persisted secrets have a server id, new ones do not, and indices
/// shift when tombstones are removed. The handle is the one key that
/// survives all of that. Clones share the handle, so the snapshot and
/// working copies of one secret always match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretHandle(u64);

impl SecretHandle {
    /// Allocate a fresh, process-unique handle.
    pub fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SecretHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A key/value pair attached to a repository.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    pub handle: SecretHandle,

    /// Server id, or `UNSAVED_ID` for secrets not yet created.
    pub id: i64,

    pub secret_key: String,

    /// Id of the owning repository (`UNSAVED_ID` until it exists).
    pub repository_id: i64,

    pub is_new: bool,

    secret_value: Option<Zeroizing<String>>,
    status: ChangeStatus,
}

impl Secret {
    /// A secret as fetched from the store: unchanged, value not shown.
    pub fn persisted(id: i64, secret_key: impl Into<String>, repository_id: i64) -> Self {
        Self {
            handle: SecretHandle::next(),
            id,
            secret_key: secret_key.into(),
            repository_id,
            is_new: false,
            secret_value: None,
            status: ChangeStatus::None,
        }
    }

    /// A brand-new secret typed in by the user.
    pub fn created(
        secret_key: impl Into<String>,
        secret_value: Option<String>,
        repository_id: i64,
    ) -> Self {
        Self {
            handle: SecretHandle::next(),
            id: UNSAVED_ID,
            secret_key: secret_key.into(),
            repository_id,
            is_new: true,
            secret_value: secret_value.map(Zeroizing::new),
            status: ChangeStatus::Created,
        }
    }

    /// An existing secret being attached to another repository.
    pub fn attached(id: i64, secret_key: impl Into<String>, repository_id: i64) -> Self {
        Self {
            status: ChangeStatus::Added,
            ..Self::persisted(id, secret_key, repository_id)
        }
    }

    pub fn status(&self) -> ChangeStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: ChangeStatus) {
        self.status = status;
    }

    /// The pending plaintext value, if the user entered one.
    pub fn value(&self) -> Option<&str> {
        self.secret_value.as_deref().map(String::as_str)
    }

    pub fn has_value(&self) -> bool {
        self.secret_value.is_some()
    }

    pub(crate) fn set_value(&mut self, value: String) {
        self.secret_value = Some(Zeroizing::new(value));
    }

    /// Wipe the plaintext and mark the secret as in sync with the store.
    pub(crate) fn mark_synced(&mut self) {
        self.secret_value = None;
        self.status = ChangeStatus::None;
        self.is_new = false;
    }

    pub fn is_deleted(&self) -> bool {
        self.status == ChangeStatus::Deleted
    }

    pub fn is_persisted(&self) -> bool {
        self.id != UNSAVED_ID
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("handle", &self.handle)
            .field("id", &self.id)
            .field("secret_key", &self.secret_key)
            .field("repository_id", &self.repository_id)
            .field("is_new", &self.is_new)
            .field(
                "secret_value",
                &self.secret_value.as_ref().map(|_| "<redacted>"),
            )
            .field("status", &self.status)
            .finish()
    }
}
