//! Aggregate result of one save.

use crate::remote::RemoteError;

use super::plan::OperationKind;

/// A remote call that succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub kind: OperationKind,
    /// Secret key or repository url the call was about.
    pub target: String,
}

/// A remote call that failed. Sibling operations are unaffected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    pub kind: OperationKind,
    pub target: String,
    pub reason: RemoteError,
}

impl std::fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}': {}", self.kind, self.target, self.reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    /// Every issued call succeeded (or nothing needed to be sent).
    Complete,
    /// Some calls succeeded, some failed; the working copy is mixed.
    Partial,
}

/// Per-item detail of a save that got past validation and, for new
/// repositories, past repository creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub repository_id: i64,
    pub repository_url: String,
    pub created: bool,
    succeeded: Vec<OperationRecord>,
    failures: Vec<OperationFailure>,
}

impl SaveReport {
    pub(crate) fn new(repository_id: i64, repository_url: &str) -> Self {
        Self {
            repository_id,
            repository_url: repository_url.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn record_success(&mut self, kind: OperationKind, target: &str) {
        self.succeeded.push(OperationRecord {
            kind,
            target: target.to_string(),
        });
    }

    pub(crate) fn record_failure(&mut self, kind: OperationKind, target: &str, reason: RemoteError) {
        self.failures.push(OperationFailure {
            kind,
            target: target.to_string(),
            reason,
        });
    }

    pub fn status(&self) -> SaveStatus {
        if self.failures.is_empty() {
            SaveStatus::Complete
        } else {
            SaveStatus::Partial
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status() == SaveStatus::Complete
    }

    pub fn succeeded(&self) -> &[OperationRecord] {
        &self.succeeded
    }

    pub fn failures(&self) -> &[OperationFailure] {
        &self.failures
    }

    pub fn operation_count(&self) -> usize {
        self.succeeded.len() + self.failures.len()
    }

    /// One-line human summary of the save.
    pub fn summary(&self) -> String {
        let url = &self.repository_url;
        let total = self.operation_count();

        if !self.is_complete() {
            let failed_secrets = self
                .failures
                .iter()
                .filter(|f| f.kind.is_secret_operation())
                .count();
            let total_secrets = self
                .succeeded
                .iter()
                .filter(|r| r.kind.is_secret_operation())
                .count()
                + failed_secrets;

            return if failed_secrets == self.failures.len() {
                format!(
                    "Repository '{url}' saved but {failed_secrets} of {total_secrets} secret operations failed"
                )
            } else {
                format!(
                    "Repository '{url}' only partially saved: {} of {total} operations failed",
                    self.failures.len()
                )
            };
        }

        if self.created {
            let secrets = total.saturating_sub(1);
            format!("Repository '{url}' created with {secrets} secret(s)")
        } else if total == 0 {
            format!("No changes to save for '{url}'")
        } else {
            format!("Repository '{url}' saved ({total} operation(s))")
        }
    }
}
