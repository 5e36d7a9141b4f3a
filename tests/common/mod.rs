//! In-process REST store for integration tests, served by axum.
//!
//! Implements the repository/secret endpoints under `/api`, logs every
//! request as "METHOD /path", and can be told to answer a given request
//! with HTTP 500.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Default)]
struct Inner {
    next_id: i64,
    repositories: BTreeMap<i64, String>,
    secrets: BTreeMap<i64, StoredSecret>,
    requests: Vec<String>,
    failing: BTreeSet<String>,
}

struct StoredSecret {
    key: String,
    value: String,
    repositories: BTreeSet<i64>,
}

impl Inner {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Log the request; `Err(500)` if it was marked as failing.
    fn enter(&mut self, request: String) -> Result<(), StatusCode> {
        let fail = self.failing.contains(&request);
        self.requests.push(request);
        if fail {
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        } else {
            Ok(())
        }
    }

    fn key_taken(&self, repository_id: i64, key: &str) -> bool {
        self.secrets
            .values()
            .any(|s| s.key == key && s.repositories.contains(&repository_id))
    }

    fn secret_json(&self, id: i64, repository_id: i64) -> Value {
        let key = self.secrets.get(&id).map(|s| s.key.clone()).unwrap_or_default();
        json!({ "id": id, "secretKey": key, "secretValue": null, "repositoryId": repository_id })
    }
}

/// Handle to the fake store's state, shared with the running server.
#[derive(Clone, Default)]
pub struct FakeStore {
    inner: Arc<Mutex<Inner>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn seed_repository(&self, url: &str, secrets: &[(&str, &str)]) -> i64 {
        let mut inner = self.lock();
        let id = inner.allocate();
        inner.repositories.insert(id, url.to_string());
        for (key, value) in secrets {
            let sid = inner.allocate();
            inner.secrets.insert(
                sid,
                StoredSecret {
                    key: key.to_string(),
                    value: value.to_string(),
                    repositories: BTreeSet::from([id]),
                },
            );
        }
        id
    }

    /// Id of the secret `key` in `repository_id`.
    pub fn secret_id(&self, repository_id: i64, key: &str) -> Option<i64> {
        self.lock()
            .secrets
            .iter()
            .find(|(_, s)| s.key == key && s.repositories.contains(&repository_id))
            .map(|(id, _)| *id)
    }

    pub fn secret_value(&self, repository_id: i64, key: &str) -> Option<String> {
        let id = self.secret_id(repository_id, key)?;
        self.lock().secrets.get(&id).map(|s| s.value.clone())
    }

    pub fn repository_id(&self, url: &str) -> Option<i64> {
        self.lock()
            .repositories
            .iter()
            .find(|(_, u)| *u == url)
            .map(|(id, _)| *id)
    }

    pub fn repository_count(&self) -> usize {
        self.lock().repositories.len()
    }

    /// Answer `request` (e.g. "PUT /secret/3") with HTTP 500.
    pub fn fail_on(&self, request: &str) {
        self.lock().failing.insert(request.to_string());
    }

    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/repository/list", get(list_repositories))
            .route("/repository", post(create_repository))
            .route(
                "/repository/:id",
                put(update_repository).delete(delete_repository),
            )
            .route("/secret", post(create_secret))
            .route("/secret/verify", post(verify_secret))
            .route("/secret/:id", put(update_secret).delete(delete_secret))
            .route("/secret/attach/:id", put(attach_secret))
            .with_state(self.clone());
        Router::new().nest("/api", api)
    }

    /// Serve on an ephemeral port from the current runtime. Returns the
    /// API base url.
    pub async fn serve(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = self.router();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    /// Serve from a dedicated thread, for tests that are not async.
    pub fn serve_in_background(&self) -> String {
        let store = self.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async move {
                let base = store.serve().await;
                tx.send(base).unwrap();
                std::future::pending::<()>().await;
            });
        });
        rx.recv().unwrap()
    }
}

#[derive(Deserialize)]
struct RepositoryBody {
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretBody {
    secret_key: String,
    #[serde(default)]
    secret_value: Option<String>,
    #[serde(default)]
    repository_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryQuery {
    repository_id: i64,
}

type Reply = Result<Json<Value>, StatusCode>;

async fn list_repositories(State(store): State<FakeStore>) -> Reply {
    let mut inner = store.lock();
    inner.enter("GET /repository/list".into())?;
    let repositories: Vec<Value> = inner
        .repositories
        .iter()
        .map(|(id, url)| {
            let secrets: Vec<Value> = inner
                .secrets
                .iter()
                .filter(|(_, s)| s.repositories.contains(id))
                .map(|(sid, _)| inner.secret_json(*sid, *id))
                .collect();
            json!({ "id": id, "url": url, "secrets": secrets })
        })
        .collect();
    Ok(Json(Value::Array(repositories)))
}

async fn create_repository(
    State(store): State<FakeStore>,
    Json(body): Json<RepositoryBody>,
) -> Reply {
    let mut inner = store.lock();
    inner.enter("POST /repository".into())?;
    if inner.repositories.values().any(|u| *u == body.url) {
        return Err(StatusCode::CONFLICT);
    }
    let id = inner.allocate();
    inner.repositories.insert(id, body.url.clone());
    Ok(Json(json!({ "id": id, "url": body.url, "secrets": [] })))
}

async fn update_repository(
    State(store): State<FakeStore>,
    Path(id): Path<i64>,
    Json(body): Json<RepositoryBody>,
) -> Reply {
    let mut inner = store.lock();
    inner.enter(format!("PUT /repository/{id}"))?;
    let url = inner.repositories.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    *url = body.url.clone();
    Ok(Json(json!({ "id": id, "url": body.url })))
}

async fn delete_repository(State(store): State<FakeStore>, Path(id): Path<i64>) -> Reply {
    let mut inner = store.lock();
    inner.enter(format!("DELETE /repository/{id}"))?;
    inner.repositories.remove(&id).ok_or(StatusCode::NOT_FOUND)?;
    for secret in inner.secrets.values_mut() {
        secret.repositories.remove(&id);
    }
    inner.secrets.retain(|_, s| !s.repositories.is_empty());
    Ok(Json(Value::Null))
}

async fn create_secret(State(store): State<FakeStore>, Json(body): Json<SecretBody>) -> Reply {
    let mut inner = store.lock();
    inner.enter("POST /secret".into())?;
    if !inner.repositories.contains_key(&body.repository_id) {
        return Err(StatusCode::NOT_FOUND);
    }
    if inner.key_taken(body.repository_id, &body.secret_key) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let id = inner.allocate();
    inner.secrets.insert(
        id,
        StoredSecret {
            key: body.secret_key,
            value: body.secret_value.unwrap_or_default(),
            repositories: BTreeSet::from([body.repository_id]),
        },
    );
    Ok(Json(inner.secret_json(id, body.repository_id)))
}

async fn update_secret(
    State(store): State<FakeStore>,
    Path(id): Path<i64>,
    Json(body): Json<SecretBody>,
) -> Reply {
    let mut inner = store.lock();
    inner.enter(format!("PUT /secret/{id}"))?;
    let secret = inner.secrets.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    secret.key = body.secret_key;
    if let Some(value) = body.secret_value {
        secret.value = value;
    }
    Ok(Json(inner.secret_json(id, body.repository_id)))
}

async fn delete_secret(
    State(store): State<FakeStore>,
    Path(id): Path<i64>,
    Query(query): Query<RepositoryQuery>,
) -> Reply {
    let mut inner = store.lock();
    inner.enter(format!("DELETE /secret/{id}"))?;
    let secret = inner.secrets.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    secret.repositories.remove(&query.repository_id);
    if secret.repositories.is_empty() {
        inner.secrets.remove(&id);
    }
    Ok(Json(Value::Null))
}

async fn attach_secret(
    State(store): State<FakeStore>,
    Path(id): Path<i64>,
    Query(query): Query<RepositoryQuery>,
) -> Reply {
    let mut inner = store.lock();
    inner.enter(format!("PUT /secret/attach/{id}"))?;
    if !inner.repositories.contains_key(&query.repository_id) {
        return Err(StatusCode::NOT_FOUND);
    }
    let secret = inner.secrets.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    secret.repositories.insert(query.repository_id);
    Ok(Json(inner.secret_json(id, query.repository_id)))
}

async fn verify_secret(State(store): State<FakeStore>, Json(body): Json<SecretBody>) -> Reply {
    let mut inner = store.lock();
    inner.enter("POST /secret/verify".into())?;
    let matches = inner.secrets.values().any(|s| {
        s.key == body.secret_key
            && s.repositories.contains(&body.repository_id)
            && Some(&s.value) == body.secret_value.as_ref()
    });
    if matches {
        Ok(Json(Value::Null))
    } else {
        Err(StatusCode::BAD_REQUEST)
    }
}
