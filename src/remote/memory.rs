//! `MemoryRemoteStore` — an in-process stand-in for the REST store.
//!
//! Mirrors the store's observable behavior (ids, per-repository key
//! uniqueness, shared secrets detached on delete) and records every call
//! in a journal as an `Issued` / `Resolved` pair. Each call yields to the
//! scheduler between the two, so concurrently issued calls interleave
//! the way real network calls do. Faults can be injected per call.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{
    paths, RemoteError, RemoteResult, RemoteStore, RepositoryRecord, SecretPayload, SecretRecord,
};

/// One call as seen by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    ListRepositories,
    CreateRepository { url: String },
    UpdateRepository { id: i64, url: String },
    DeleteRepository { id: i64 },
    CreateSecret { key: String, repository_id: i64 },
    UpdateSecret { id: i64, key: String },
    DeleteSecret { id: i64, repository_id: i64 },
    AttachSecret { id: i64, repository_id: i64 },
    VerifySecret { key: String, repository_id: i64 },
}

impl RemoteCall {
    fn method(&self) -> &'static str {
        match self {
            Self::ListRepositories => "GET",
            Self::CreateRepository { .. }
            | Self::CreateSecret { .. }
            | Self::VerifySecret { .. } => "POST",
            Self::UpdateRepository { .. } | Self::UpdateSecret { .. } | Self::AttachSecret { .. } => {
                "PUT"
            }
            Self::DeleteRepository { .. } | Self::DeleteSecret { .. } => "DELETE",
        }
    }

    fn path(&self) -> String {
        match self {
            Self::ListRepositories => paths::REPOSITORY_LIST.to_string(),
            Self::CreateRepository { .. } => paths::REPOSITORY.to_string(),
            Self::UpdateRepository { id, .. } | Self::DeleteRepository { id } => {
                paths::repository(*id)
            }
            Self::CreateSecret { .. } => paths::SECRET.to_string(),
            Self::UpdateSecret { id, .. } | Self::DeleteSecret { id, .. } => paths::secret(*id),
            Self::AttachSecret { id, .. } => paths::secret_attach(*id),
            Self::VerifySecret { .. } => paths::SECRET_VERIFY.to_string(),
        }
    }
}

/// Journal line: a call was sent, or a call finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    Issued(RemoteCall),
    Resolved { call: RemoteCall, ok: bool },
}

type FaultRule = Box<dyn Fn(&RemoteCall) -> bool + Send + Sync>;

struct StoredSecret {
    key: String,
    value: String,
    repositories: BTreeSet<i64>,
}

#[derive(Default)]
struct State {
    next_id: i64,
    repositories: BTreeMap<i64, String>,
    secrets: BTreeMap<i64, StoredSecret>,
    journal: Vec<JournalEntry>,
}

impl State {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn key_in_repository(&self, repository_id: i64, key: &str) -> Option<i64> {
        self.secrets
            .iter()
            .find(|(_, s)| s.key == key && s.repositories.contains(&repository_id))
            .map(|(id, _)| *id)
    }

    fn record(&self, id: i64, repository_id: i64) -> Option<SecretRecord> {
        self.secrets.get(&id).map(|s| SecretRecord {
            id,
            secret_key: s.key.clone(),
            repository_id,
        })
    }
}

/// In-memory remote store.
#[derive(Default)]
pub struct MemoryRemoteStore {
    state: Mutex<State>,
    faults: Mutex<Vec<FaultRule>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call matching `rule` fail with HTTP 500.
    pub fn fail_when(&self, rule: impl Fn(&RemoteCall) -> bool + Send + Sync + 'static) {
        lock(&self.faults).push(Box::new(rule));
    }

    /// Create a repository with secrets directly, bypassing the journal.
    /// Returns the repository id.
    pub fn seed_repository(&self, url: &str, secrets: &[(&str, &str)]) -> i64 {
        let mut state = lock(&self.state);
        let repository_id = state.allocate_id();
        state.repositories.insert(repository_id, url.to_string());
        for (key, value) in secrets {
            let id = state.allocate_id();
            state.secrets.insert(
                id,
                StoredSecret {
                    key: (*key).to_string(),
                    value: (*value).to_string(),
                    repositories: BTreeSet::from([repository_id]),
                },
            );
        }
        repository_id
    }

    /// Every journal entry, in order.
    pub fn journal(&self) -> Vec<JournalEntry> {
        lock(&self.state).journal.clone()
    }

    /// Only the calls that were issued, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        lock(&self.state)
            .journal
            .iter()
            .filter_map(|entry| match entry {
                JournalEntry::Issued(call) => Some(call.clone()),
                JournalEntry::Resolved { .. } => None,
            })
            .collect()
    }

    pub fn repository_url(&self, id: i64) -> Option<String> {
        lock(&self.state).repositories.get(&id).cloned()
    }

    /// Stored plaintext of the secret `key` in `repository_id`.
    pub fn secret_value(&self, repository_id: i64, key: &str) -> Option<String> {
        let state = lock(&self.state);
        let id = state.key_in_repository(repository_id, key)?;
        state.secrets.get(&id).map(|s| s.value.clone())
    }

    /// Sorted keys of the secrets attached to `repository_id`.
    pub fn secret_keys(&self, repository_id: i64) -> Vec<String> {
        let state = lock(&self.state);
        let mut keys: Vec<String> = state
            .secrets
            .values()
            .filter(|s| s.repositories.contains(&repository_id))
            .map(|s| s.key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Journal the call, let other tasks run, then apply `op` unless a
    /// fault rule matches.
    async fn call<T>(
        &self,
        call: RemoteCall,
        op: impl FnOnce(&mut State) -> Result<T, u16>,
    ) -> RemoteResult<T> {
        lock(&self.state)
            .journal
            .push(JournalEntry::Issued(call.clone()));

        tokio::task::yield_now().await;

        let faulted = lock(&self.faults).iter().any(|rule| rule(&call));
        let mut state = lock(&self.state);
        let result = if faulted { Err(500) } else { op(&mut state) };
        state.journal.push(JournalEntry::Resolved {
            call: call.clone(),
            ok: result.is_ok(),
        });

        result.map_err(|status| RemoteError::Status {
            method: call.method(),
            path: call.path(),
            status,
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn list_repositories(&self) -> RemoteResult<Vec<RepositoryRecord>> {
        self.call(RemoteCall::ListRepositories, |state| {
            Ok(state
                .repositories
                .iter()
                .map(|(id, url)| RepositoryRecord {
                    id: *id,
                    url: url.clone(),
                    secrets: state
                        .secrets
                        .iter()
                        .filter(|(_, s)| s.repositories.contains(id))
                        .map(|(sid, s)| SecretRecord {
                            id: *sid,
                            secret_key: s.key.clone(),
                            repository_id: *id,
                        })
                        .collect(),
                })
                .collect())
        })
        .await
    }

    async fn create_repository(&self, url: &str) -> RemoteResult<RepositoryRecord> {
        let call = RemoteCall::CreateRepository {
            url: url.to_string(),
        };
        self.call(call, |state| {
            if state.repositories.values().any(|u| u == url) {
                return Err(409);
            }
            let id = state.allocate_id();
            state.repositories.insert(id, url.to_string());
            Ok(RepositoryRecord {
                id,
                url: url.to_string(),
                secrets: Vec::new(),
            })
        })
        .await
    }

    async fn update_repository(&self, id: i64, url: &str) -> RemoteResult<RepositoryRecord> {
        let call = RemoteCall::UpdateRepository {
            id,
            url: url.to_string(),
        };
        self.call(call, |state| {
            let stored = state.repositories.get_mut(&id).ok_or(404_u16)?;
            *stored = url.to_string();
            Ok(RepositoryRecord {
                id,
                url: url.to_string(),
                secrets: Vec::new(),
            })
        })
        .await
    }

    async fn delete_repository(&self, id: i64) -> RemoteResult<()> {
        self.call(RemoteCall::DeleteRepository { id }, |state| {
            state.repositories.remove(&id).ok_or(404_u16)?;
            for secret in state.secrets.values_mut() {
                secret.repositories.remove(&id);
            }
            state.secrets.retain(|_, s| !s.repositories.is_empty());
            Ok(())
        })
        .await
    }

    async fn create_secret(&self, secret: &SecretPayload<'_>) -> RemoteResult<SecretRecord> {
        let call = RemoteCall::CreateSecret {
            key: secret.secret_key.to_string(),
            repository_id: secret.repository_id,
        };
        let repository_id = secret.repository_id;
        let key = secret.secret_key.to_string();
        let value = secret.secret_value.unwrap_or_default().to_string();
        self.call(call, move |state| {
            if !state.repositories.contains_key(&repository_id) {
                return Err(404);
            }
            if state.key_in_repository(repository_id, &key).is_some() {
                return Err(400);
            }
            let id = state.allocate_id();
            state.secrets.insert(
                id,
                StoredSecret {
                    key,
                    value,
                    repositories: BTreeSet::from([repository_id]),
                },
            );
            state.record(id, repository_id).ok_or(500)
        })
        .await
    }

    async fn update_secret(
        &self,
        id: i64,
        secret: &SecretPayload<'_>,
    ) -> RemoteResult<SecretRecord> {
        let call = RemoteCall::UpdateSecret {
            id,
            key: secret.secret_key.to_string(),
        };
        let repository_id = secret.repository_id;
        let value = secret.secret_value.unwrap_or_default().to_string();
        self.call(call, move |state| {
            let stored = state.secrets.get_mut(&id).ok_or(404_u16)?;
            stored.value = value;
            state.record(id, repository_id).ok_or(500)
        })
        .await
    }

    async fn delete_secret(&self, id: i64, repository_id: i64) -> RemoteResult<()> {
        self.call(RemoteCall::DeleteSecret { id, repository_id }, |state| {
            let stored = state.secrets.get_mut(&id).ok_or(404_u16)?;
            stored.repositories.remove(&repository_id);
            if stored.repositories.is_empty() {
                state.secrets.remove(&id);
            }
            Ok(())
        })
        .await
    }

    async fn attach_secret(&self, id: i64, repository_id: i64) -> RemoteResult<SecretRecord> {
        self.call(RemoteCall::AttachSecret { id, repository_id }, |state| {
            if !state.repositories.contains_key(&repository_id) {
                return Err(404);
            }
            let stored = state.secrets.get_mut(&id).ok_or(404_u16)?;
            stored.repositories.insert(repository_id);
            state.record(id, repository_id).ok_or(500)
        })
        .await
    }

    async fn verify_secret(&self, secret: &SecretPayload<'_>) -> RemoteResult<()> {
        let call = RemoteCall::VerifySecret {
            key: secret.secret_key.to_string(),
            repository_id: secret.repository_id,
        };
        let repository_id = secret.repository_id;
        let key = secret.secret_key.to_string();
        let candidate = secret.secret_value.unwrap_or_default().to_string();
        self.call(call, move |state| {
            let id = state.key_in_repository(repository_id, &key).ok_or(404_u16)?;
            match state.secrets.get(&id) {
                Some(stored) if stored.value == candidate => Ok(()),
                _ => Err(400),
            }
        })
        .await
    }
}
