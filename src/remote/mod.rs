//! Remote module — the boundary to the repository/secret REST store.
//!
//! The store only offers per-entity create/update/delete/attach calls;
//! there is no batch or transactional endpoint. This module provides:
//! - the `RemoteStore` trait the reconciliation engine talks to
//! - the JSON wire records exchanged with the store
//! - `HttpRemoteStore`, the reqwest-backed implementation (`http`)
//! - `MemoryRemoteStore`, an in-process store with fault injection (`memory`)

pub mod http;
pub mod memory;

pub use http::HttpRemoteStore;
pub use memory::{JournalEntry, MemoryRemoteStore, RemoteCall};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Repository, Secret};

/// REST paths, relative to the configured server url.
pub mod paths {
    pub const REPOSITORY_LIST: &str = "/repository/list";
    pub const REPOSITORY: &str = "/repository";
    pub const SECRET: &str = "/secret";
    pub const SECRET_VERIFY: &str = "/secret/verify";

    pub fn repository(id: i64) -> String {
        format!("/repository/{id}")
    }

    pub fn secret(id: i64) -> String {
        format!("/secret/{id}")
    }

    pub fn secret_attach(id: i64) -> String {
        format!("/secret/attach/{id}")
    }
}

/// Failure of one remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("{method} {path} returned HTTP {status}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// A repository as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRecord {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub secrets: Vec<SecretRecord>,
}

/// A secret as returned by the store. Values are never echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretRecord {
    #[serde(default)]
    pub id: i64,
    pub secret_key: String,
    #[serde(default)]
    pub repository_id: i64,
}

/// Request body for repository create/update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryPayload<'a> {
    pub id: i64,
    pub url: &'a str,
}

/// Request body for secret create/update/verify.
///
/// Borrows the plaintext so no extra copy of it outlives the request.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretPayload<'a> {
    pub id: i64,
    pub secret_key: &'a str,
    pub secret_value: Option<&'a str>,
    pub repository_id: i64,
}

impl std::fmt::Debug for SecretPayload<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretPayload")
            .field("id", &self.id)
            .field("secret_key", &self.secret_key)
            .field("secret_value", &self.secret_value.map(|_| "<redacted>"))
            .field("repository_id", &self.repository_id)
            .finish()
    }
}

impl From<RepositoryRecord> for Repository {
    fn from(record: RepositoryRecord) -> Self {
        let id = record.id;
        let secrets = record
            .secrets
            .into_iter()
            .map(|s| Secret::persisted(s.id, s.secret_key, id))
            .collect();
        Repository::persisted(id, record.url, secrets)
    }
}

/// The operations the remote store exposes. Each call either returns
/// the persisted entity or fails; none can be cancelled once issued.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_repositories(&self) -> RemoteResult<Vec<RepositoryRecord>>;

    async fn create_repository(&self, url: &str) -> RemoteResult<RepositoryRecord>;

    async fn update_repository(&self, id: i64, url: &str) -> RemoteResult<RepositoryRecord>;

    async fn delete_repository(&self, id: i64) -> RemoteResult<()>;

    async fn create_secret(&self, secret: &SecretPayload<'_>) -> RemoteResult<SecretRecord>;

    async fn update_secret(&self, id: i64, secret: &SecretPayload<'_>)
        -> RemoteResult<SecretRecord>;

    /// Detach the secret from `repository_id`; the store deletes it
    /// once no repository uses it.
    async fn delete_secret(&self, id: i64, repository_id: i64) -> RemoteResult<()>;

    async fn attach_secret(&self, id: i64, repository_id: i64) -> RemoteResult<SecretRecord>;

    /// Succeeds iff the candidate value matches the stored one.
    async fn verify_secret(&self, secret: &SecretPayload<'_>) -> RemoteResult<()>;
}
