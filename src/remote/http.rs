//! `HttpRemoteStore` — talks to the store's REST API with reqwest.
//!
//! Any non-2xx response fails that single call; the body is ignored.
//! Timeouts are the transport's job, configured once on the client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Settings;
use crate::errors::{Result, SecretSyncError};

use super::{
    paths, RemoteError, RemoteResult, RemoteStore, RepositoryPayload, RepositoryRecord,
    SecretPayload, SecretRecord,
};

/// Remote store reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
}

impl HttpRemoteStore {
    /// Build a store rooted at `base_url` (e.g. "http://127.0.0.1:8080/api").
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("secretsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SecretSyncError::ConfigError(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(&settings.server_url, settings.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    /// Send a request and decode the JSON body of a 2xx response.
    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &'static str,
        path: &str,
    ) -> RemoteResult<T> {
        let response = self.send(request, method, path).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(format!("{method} {path}: {e}")))
    }

    /// Send a request whose response body is irrelevant.
    async fn send(
        &self,
        request: RequestBuilder,
        method: &'static str,
        path: &str,
    ) -> RemoteResult<reqwest::Response> {
        debug!(method, path, "sending request");

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("{method} {path}: {e}")))?;

        let status = response.status();
        debug!(method, path, status = status.as_u16(), "received response");

        if !status.is_success() {
            return Err(RemoteError::Status {
                method,
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn list_repositories(&self) -> RemoteResult<Vec<RepositoryRecord>> {
        let path = paths::REPOSITORY_LIST;
        self.fetch(self.request(Method::GET, path), "GET", path)
            .await
    }

    async fn create_repository(&self, url: &str) -> RemoteResult<RepositoryRecord> {
        let path = paths::REPOSITORY;
        let body = RepositoryPayload { id: 0, url };
        self.fetch(self.request(Method::POST, path).json(&body), "POST", path)
            .await
    }

    async fn update_repository(&self, id: i64, url: &str) -> RemoteResult<RepositoryRecord> {
        let path = paths::repository(id);
        let body = RepositoryPayload { id, url };
        self.fetch(self.request(Method::PUT, &path).json(&body), "PUT", &path)
            .await
    }

    async fn delete_repository(&self, id: i64) -> RemoteResult<()> {
        let path = paths::repository(id);
        self.send(self.request(Method::DELETE, &path), "DELETE", &path)
            .await
            .map(|_| ())
    }

    async fn create_secret(&self, secret: &SecretPayload<'_>) -> RemoteResult<SecretRecord> {
        let path = paths::SECRET;
        self.fetch(self.request(Method::POST, path).json(secret), "POST", path)
            .await
    }

    async fn update_secret(
        &self,
        id: i64,
        secret: &SecretPayload<'_>,
    ) -> RemoteResult<SecretRecord> {
        let path = paths::secret(id);
        self.fetch(self.request(Method::PUT, &path).json(secret), "PUT", &path)
            .await
    }

    async fn delete_secret(&self, id: i64, repository_id: i64) -> RemoteResult<()> {
        let path = paths::secret(id);
        let request = self
            .request(Method::DELETE, &path)
            .query(&[("repositoryId", repository_id)]);
        self.send(request, "DELETE", &path).await.map(|_| ())
    }

    async fn attach_secret(&self, id: i64, repository_id: i64) -> RemoteResult<SecretRecord> {
        let path = paths::secret_attach(id);
        let request = self
            .request(Method::PUT, &path)
            .query(&[("repositoryId", repository_id)]);
        self.fetch(request, "PUT", &path).await
    }

    async fn verify_secret(&self, secret: &SecretPayload<'_>) -> RemoteResult<()> {
        let path = paths::SECRET_VERIFY;
        self.send(
            self.request(Method::POST, path).json(secret),
            "POST",
            path,
        )
        .await
        .map(|_| ())
    }
}
