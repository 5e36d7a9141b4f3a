//! Audit log — SQLite-based history of remote operations.
//!
//! Every operation a save issues, plus repository deletes and secret
//! verifications, is recorded in `<state_dir>/audit.db`. Values are
//! never written, only keys and urls.
//!
//! Logging is fire-and-forget: if the database can't be opened or
//! written to, the command continues without it. Without the
//! `audit-log` feature the helpers are no-ops.

#[cfg(feature = "audit-log")]
mod store;

#[cfg(feature = "audit-log")]
pub use store::{AuditEntry, AuditLog, AuditRecord};

use std::path::PathBuf;

use crate::config::Settings;
use crate::reconcile::SaveReport;

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_FAILED: &str = "failed";

/// Directory holding `audit.db`, resolved against the current directory.
pub fn state_dir(settings: &Settings) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    Some(settings.state_path(&cwd))
}

/// Record one operation. Never fails the caller.
#[cfg(feature = "audit-log")]
pub fn log_audit(
    settings: &Settings,
    operation: &str,
    repository: &str,
    secret_key: Option<&str>,
    outcome: &str,
    details: Option<&str>,
) {
    write(
        settings,
        &[AuditRecord {
            operation,
            repository,
            secret_key,
            outcome,
            details,
        }],
    );
}

#[cfg(not(feature = "audit-log"))]
pub fn log_audit(
    _settings: &Settings,
    _operation: &str,
    _repository: &str,
    _secret_key: Option<&str>,
    _outcome: &str,
    _details: Option<&str>,
) {
}

/// Record every operation of a finished save in one transaction.
#[cfg(feature = "audit-log")]
pub fn log_report(settings: &Settings, report: &SaveReport) {
    let repository = report.repository_url.as_str();
    let reasons: Vec<String> = report
        .failures()
        .iter()
        .map(|f| f.reason.to_string())
        .collect();

    let succeeded = report.succeeded().iter().map(|op| AuditRecord {
        operation: op.kind.as_str(),
        repository,
        secret_key: op.kind.is_secret_operation().then_some(op.target.as_str()),
        outcome: OUTCOME_OK,
        details: None,
    });
    let failed = report.failures().iter().zip(&reasons).map(|(f, reason)| AuditRecord {
        operation: f.kind.as_str(),
        repository,
        secret_key: f.kind.is_secret_operation().then_some(f.target.as_str()),
        outcome: OUTCOME_FAILED,
        details: Some(reason.as_str()),
    });

    let records: Vec<AuditRecord<'_>> = succeeded.chain(failed).collect();
    if !records.is_empty() {
        write(settings, &records);
    }
}

#[cfg(not(feature = "audit-log"))]
pub fn log_report(_settings: &Settings, _report: &SaveReport) {}

#[cfg(feature = "audit-log")]
fn write(settings: &Settings, records: &[AuditRecord<'_>]) {
    let Some(dir) = state_dir(settings) else {
        return;
    };
    if let Err(e) = AuditLog::open(&dir).and_then(|mut log| log.append(records)) {
        tracing::debug!(error = %e, "audit log unavailable");
    }
}
