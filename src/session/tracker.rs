//! `ChangeTracker` — applies user intents to a working copy.
//!
//! Every mutation of a secret goes through here so its `ChangeStatus`
//! follows the transition table in `model::status`. Intents that the
//! table rejects leave the working copy untouched.

use crate::errors::{Result, SecretSyncError};
use crate::model::{ChangeEvent, ChangeStatus, Repository, Secret, SecretHandle, Transition};

/// Borrowed view over a working copy that records intents.
pub struct ChangeTracker<'a> {
    repository: &'a mut Repository,
}

impl<'a> ChangeTracker<'a> {
    pub fn new(repository: &'a mut Repository) -> Self {
        Self { repository }
    }

    /// Add a brand-new secret. It starts out `Created`.
    pub fn add_secret(&mut self, key: &str, value: Option<String>) -> SecretHandle {
        let secret = Secret::created(key, value, self.repository.id);
        let handle = secret.handle;
        self.repository.secrets.push(secret);
        handle
    }

    /// Attach an existing secret (by server id) to this repository.
    pub fn attach_secret(&mut self, id: i64, key: &str) -> SecretHandle {
        let secret = Secret::attached(id, key, self.repository.id);
        let handle = secret.handle;
        self.repository.secrets.push(secret);
        handle
    }

    /// Replace a secret's value. Returns the resulting status.
    pub fn edit_value(&mut self, handle: SecretHandle, value: String) -> Result<ChangeStatus> {
        let Transition::Become(next) = self.transition(handle, ChangeEvent::EditValue)? else {
            return Err(self.illegal(handle, ChangeEvent::EditValue));
        };

        let secret = self.secret_mut(handle)?;
        secret.set_value(value);
        secret.set_status(next);
        Ok(next)
    }

    /// Rename a secret.
    ///
    /// The rename is applied even when it collides; the handles of the
    /// other visible secrets sharing the new key are returned so the
    /// caller can warn right away. The save-time validator rejects the
    /// collision if it is still there.
    pub fn edit_key(&mut self, handle: SecretHandle, key: &str) -> Result<Vec<SecretHandle>> {
        self.transition(handle, ChangeEvent::EditKey)?;
        self.secret_mut(handle)?.secret_key = key.to_string();
        Ok(self.key_conflicts(handle))
    }

    /// Delete a secret.
    ///
    /// Secrets never sent to the store are dropped from the sequence;
    /// persisted ones become tombstones until the next save.
    pub fn delete_secret(&mut self, handle: SecretHandle) -> Result<Transition> {
        let transition = self.transition(handle, ChangeEvent::Delete)?;
        match transition {
            Transition::Remove => {
                self.repository.remove_secret(handle);
            }
            Transition::Become(status) => self.secret_mut(handle)?.set_status(status),
        }
        Ok(transition)
    }

    pub fn set_url(&mut self, url: &str) {
        self.repository.url = url.to_string();
    }

    /// Other visible secrets whose key equals this secret's key.
    pub fn key_conflicts(&self, handle: SecretHandle) -> Vec<SecretHandle> {
        let Some(target) = self.repository.secret(handle) else {
            return Vec::new();
        };
        if target.is_deleted() {
            return Vec::new();
        }

        self.repository
            .visible_secrets()
            .filter(|s| s.handle != handle && s.secret_key == target.secret_key)
            .map(|s| s.handle)
            .collect()
    }

    /// Handle of the first visible secret with this key.
    pub fn find_by_key(&self, key: &str) -> Option<SecretHandle> {
        self.repository.find_by_key(key).map(|s| s.handle)
    }

    fn transition(&self, handle: SecretHandle, event: ChangeEvent) -> Result<Transition> {
        let secret = self
            .repository
            .secret(handle)
            .ok_or(SecretSyncError::UnknownSecret)?;

        secret
            .status()
            .apply(event)
            .ok_or_else(|| self.illegal(handle, event))
    }

    fn illegal(&self, handle: SecretHandle, event: ChangeEvent) -> SecretSyncError {
        match self.repository.secret(handle) {
            Some(secret) => SecretSyncError::IllegalTransition {
                key: secret.secret_key.clone(),
                status: secret.status(),
                event,
            },
            None => SecretSyncError::UnknownSecret,
        }
    }

    fn secret_mut(&mut self, handle: SecretHandle) -> Result<&mut Secret> {
        self.repository
            .secret_mut(handle)
            .ok_or(SecretSyncError::UnknownSecret)
    }
}
