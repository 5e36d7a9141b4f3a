//! `ReconcileEngine` — executes a `SavePlan` against a `RemoteStore`.
//!
//! The store has no transactions, so a save is a sequence of
//! independent calls:
//!
//! 1. (new repository) create the repository; abort everything if that fails
//! 2. delete tombstones, one at a time, each awaited before the next
//! 3. create / update / attach secrets concurrently, joined before going on
//! 4. (existing repository) update the url if it changed
//!
//! Completions update the working copy by `SecretHandle`, never by
//! index, so a delete that shortened the sequence cannot misdirect a
//! later result. Failed items keep their status and value so the user
//! can save again.

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::errors::{Result, SecretSyncError};
use crate::model::{Repository, Secret, SecretHandle, UNSAVED_ID};
use crate::remote::{RemoteResult, RemoteStore, SecretPayload, SecretRecord};
use crate::session::EditSession;
use crate::validate;

use super::outcome::SaveReport;
use super::plan::{self, DeleteStep, OperationKind, SavePlan, UpsertKind, UpsertStep};

/// Default bound on concurrently outstanding upsert calls.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Owned snapshot of what one upsert call needs to send.
struct UpsertRequest {
    step: UpsertStep,
    id: i64,
    repository_id: i64,
    value: Option<Zeroizing<String>>,
}

/// Runs saves against one remote store.
pub struct ReconcileEngine<R> {
    remote: R,
    max_in_flight: usize,
}

impl<R: RemoteStore> ReconcileEngine<R> {
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Bound the number of upsert calls in flight at once (minimum 1).
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Validate the working copy against `known`, then save it.
    ///
    /// Returns `SecretSyncError::Validation` without any remote call
    /// when the working copy breaks a business rule.
    pub async fn submit(
        &self,
        session: &mut EditSession,
        known: &[Repository],
    ) -> Result<SaveReport> {
        let (selected, _) = session.parts_mut();
        validate::check(selected, known)?;
        self.save(session).await
    }

    /// Reconcile the session's working copy with the store.
    ///
    /// - `Err(AbortedCreate)`: a new repository could not be created and
    ///   nothing else was attempted.
    /// - `Ok(report)`: every planned call was issued; `report.status()`
    ///   tells whether all of them succeeded.
    pub async fn save(&self, session: &mut EditSession) -> Result<SaveReport> {
        let (selected, original) = session.parts_mut();
        let plan = plan::plan(selected, original);

        info!(
            repository = %selected.url,
            operations = plan.operation_count(),
            new = selected.is_new,
            "saving repository"
        );

        let report = if plan.create_repository {
            self.save_new(selected, original, &plan).await?
        } else {
            self.save_existing(selected, original, &plan).await
        };

        if report.is_complete() {
            info!(repository = %report.repository_url, "save complete");
        } else {
            warn!(
                repository = %report.repository_url,
                failed = report.failures().len(),
                "save partially failed"
            );
        }
        Ok(report)
    }

    async fn save_new(
        &self,
        selected: &mut Repository,
        original: &mut Repository,
        plan: &SavePlan,
    ) -> Result<SaveReport> {
        debug!(url = %selected.url, "creating repository");
        let record = match self.remote.create_repository(&selected.url).await {
            Ok(record) if record.id != UNSAVED_ID => record,
            Ok(_) => {
                return Err(SecretSyncError::AbortedCreate {
                    url: selected.url.clone(),
                    reason: "store returned no repository id".into(),
                })
            }
            Err(e) => {
                warn!(url = %selected.url, error = %e, "repository creation failed");
                return Err(SecretSyncError::AbortedCreate {
                    url: selected.url.clone(),
                    reason: e.to_string(),
                });
            }
        };

        // Adopt the server identity before any secret is sent.
        selected.id = record.id;
        selected.url = record.url;
        selected.is_new = false;
        for secret in &mut selected.secrets {
            secret.repository_id = record.id;
        }
        original.id = selected.id;
        original.url = selected.url.clone();
        original.is_new = false;

        let mut report = SaveReport::new(selected.id, &selected.url);
        report.created = true;
        report.record_success(OperationKind::CreateRepository, &selected.url);

        self.upsert_phase(selected, original, &plan.upserts, &mut report)
            .await;
        Ok(report)
    }

    async fn save_existing(
        &self,
        selected: &mut Repository,
        original: &mut Repository,
        plan: &SavePlan,
    ) -> SaveReport {
        let mut report = SaveReport::new(selected.id, &selected.url);

        self.delete_phase(selected, original, &plan.deletes, &mut report)
            .await;
        self.upsert_phase(selected, original, &plan.upserts, &mut report)
            .await;

        // Runs only after every secret call has resolved.
        if let Some(url) = &plan.url_update {
            debug!(id = selected.id, url = %url, "updating repository url");
            match self.remote.update_repository(selected.id, url).await {
                Ok(record) => {
                    selected.url = record.url;
                    original.url = selected.url.clone();
                    report.repository_url = selected.url.clone();
                    report.record_success(OperationKind::UpdateRepository, &selected.url);
                }
                Err(e) => {
                    warn!(id = selected.id, error = %e, "repository update failed");
                    report.record_failure(OperationKind::UpdateRepository, url, e);
                }
            }
        }

        report
    }

    /// Strictly sequential: a key freed here may be reused by a create
    /// in the next phase.
    async fn delete_phase(
        &self,
        selected: &mut Repository,
        original: &mut Repository,
        deletes: &[DeleteStep],
        report: &mut SaveReport,
    ) {
        for step in deletes {
            debug!(key = %step.secret_key, id = step.id, "deleting secret");
            match self.remote.delete_secret(step.id, selected.id).await {
                Ok(()) => {
                    selected.remove_secret(step.handle);
                    original.remove_secret(step.handle);
                    report.record_success(OperationKind::DeleteSecret, &step.secret_key);
                }
                Err(e) => {
                    warn!(key = %step.secret_key, error = %e, "secret delete failed");
                    report.record_failure(OperationKind::DeleteSecret, &step.secret_key, e);
                }
            }
        }
    }

    /// Issue every upsert (bounded concurrency), join on all of them,
    /// then fold the results into the working copy by handle.
    async fn upsert_phase(
        &self,
        selected: &mut Repository,
        original: &mut Repository,
        upserts: &[UpsertStep],
        report: &mut SaveReport,
    ) {
        let requests: Vec<UpsertRequest> = upserts
            .iter()
            .filter_map(|step| {
                let secret = selected.secret(step.handle)?;
                Some(UpsertRequest {
                    step: step.clone(),
                    id: secret.id,
                    repository_id: selected.id,
                    value: secret.value().map(|v| Zeroizing::new(v.to_string())),
                })
            })
            .collect();

        let results: Vec<(UpsertStep, RemoteResult<SecretRecord>)> = stream::iter(requests)
            .map(|request| async move {
                let result = self.dispatch(&request).await;
                (request.step, result)
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        for (step, result) in results {
            let operation = step.kind.operation();
            match result {
                Ok(record) => {
                    apply_synced(selected, original, step.handle, &record);
                    debug!(key = %step.secret_key, %operation, "secret synced");
                    report.record_success(operation, &step.secret_key);
                }
                Err(e) => {
                    warn!(key = %step.secret_key, %operation, error = %e, "secret operation failed");
                    report.record_failure(operation, &step.secret_key, e);
                }
            }
        }
    }

    async fn dispatch(&self, request: &UpsertRequest) -> RemoteResult<SecretRecord> {
        let value = request.value.as_deref().map(String::as_str);
        let payload = SecretPayload {
            id: request.id,
            secret_key: &request.step.secret_key,
            secret_value: value,
            repository_id: request.repository_id,
        };

        debug!(key = %request.step.secret_key, kind = ?request.step.kind, "issuing secret call");
        match request.step.kind {
            UpsertKind::Create => {
                let payload = SecretPayload {
                    secret_value: Some(value.unwrap_or_default()),
                    ..payload
                };
                self.remote.create_secret(&payload).await
            }
            UpsertKind::Update => self.remote.update_secret(request.id, &payload).await,
            UpsertKind::Attach => {
                self.remote
                    .attach_secret(request.id, request.repository_id)
                    .await
            }
        }
    }
}

/// Mark a secret as in sync in the working copy and mirror it into
/// the snapshot, so a retry only re-sends what failed.
fn apply_synced(
    selected: &mut Repository,
    original: &mut Repository,
    handle: SecretHandle,
    record: &SecretRecord,
) {
    let repository_id = selected.id;
    let Some(secret) = selected.secret_mut(handle) else {
        return;
    };
    if record.id != UNSAVED_ID {
        secret.id = record.id;
    }
    secret.repository_id = repository_id;
    secret.mark_synced();

    let synced: Secret = secret.clone();
    match original.secret_mut(handle) {
        Some(snapshot) => *snapshot = synced,
        None => original.secrets.push(synced),
    }
}
