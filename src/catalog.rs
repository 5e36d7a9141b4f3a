//! Catalog — the list of repositories known to the caller.
//!
//! Loaded once from the store, then kept in step with saves and deletes
//! so validation can check url uniqueness without refetching.

use tracing::debug;

use crate::errors::{Result, SecretSyncError};
use crate::model::{Repository, Secret};
use crate::remote::RemoteStore;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    repositories: Vec<Repository>,
}

impl Catalog {
    /// Fetch every repository from the store. Secrets come back
    /// unchanged, persisted, and without values.
    pub async fn load<R: RemoteStore + ?Sized>(remote: &R) -> Result<Self> {
        let records = remote.list_repositories().await?;
        debug!(count = records.len(), "loaded repository list");
        Ok(Self::from_repositories(
            records.into_iter().map(Repository::from).collect(),
        ))
    }

    pub fn from_repositories(repositories: Vec<Repository>) -> Self {
        Self { repositories }
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    /// Look up a repository by numeric id or by exact url.
    pub fn find(&self, selector: &str) -> Option<&Repository> {
        let selector = selector.trim();
        if let Ok(id) = selector.parse::<i64>() {
            if let Some(found) = self.repositories.iter().find(|r| r.id == id) {
                return Some(found);
            }
        }
        self.repositories.iter().find(|r| r.url == selector)
    }

    /// Like `find`, but a miss is an error.
    pub fn get(&self, selector: &str) -> Result<&Repository> {
        self.find(selector)
            .ok_or_else(|| SecretSyncError::RepositoryNotFound(selector.to_string()))
    }

    /// Insert a newly created repository, or replace the stored one with
    /// the same id.
    pub fn merge(&mut self, repository: Repository) {
        match self.repositories.iter_mut().find(|r| r.id == repository.id) {
            Some(existing) => *existing = repository,
            None => self.repositories.push(repository),
        }
    }

    /// Merge the snapshot of a saved session. Only what the store holds is
    /// kept: persisted secrets, unchanged and without values.
    pub fn merge_saved(&mut self, snapshot: &Repository) {
        let secrets = snapshot
            .secrets
            .iter()
            .filter(|s| s.is_persisted() && !s.is_deleted())
            .map(|s| Secret::persisted(s.id, s.secret_key.clone(), snapshot.id))
            .collect();
        self.merge(Repository::persisted(snapshot.id, snapshot.url.clone(), secrets));
    }

    /// Drop a repository after it was deleted remotely.
    pub fn remove(&mut self, id: i64) -> Option<Repository> {
        let index = self.repositories.iter().position(|r| r.id == id)?;
        Some(self.repositories.remove(index))
    }

    /// Find a secret by id in any repository (used to attach it elsewhere).
    pub fn find_secret(&self, id: i64) -> Option<&Secret> {
        self.repositories
            .iter()
            .flat_map(|r| r.secrets.iter())
            .find(|s| s.id == id)
    }
}
