//! Command implementations, one module per subcommand, plus the helpers
//! `add` and `edit` share for applying flags and saving.

pub mod add;
pub mod audit_cmd;
pub mod completions;
pub mod delete;
pub mod edit;
pub mod interactive;
pub mod list;
pub mod show;
pub mod verify;

use crate::audit;
use crate::catalog::Catalog;
use crate::cli::assignments::{parse_assignment, parse_env_file};
use crate::cli::{output, SecretChanges};
use crate::config::Settings;
use crate::errors::{Result, SecretSyncError};
use crate::reconcile::{ReconcileEngine, SaveReport};
use crate::remote::RemoteStore;
use crate::session::EditSession;

/// Apply `--unset`, `--from-file`, `--set` and `--attach` to a session,
/// in that order, so a key removed here can be created again in the
/// same save.
pub fn apply_changes(
    session: &mut EditSession,
    catalog: &Catalog,
    unset: &[String],
    changes: &SecretChanges,
) -> Result<()> {
    let mut assignments = match &changes.from_file {
        Some(path) => parse_env_file(path)?,
        None => Vec::new(),
    };
    for arg in &changes.set {
        assignments.push(parse_assignment(arg)?);
    }

    let mut tracker = session.tracker();

    for key in unset {
        let handle = tracker.find_by_key(key).ok_or_else(|| {
            SecretSyncError::CommandFailed(format!("no secret named '{key}' to unset"))
        })?;
        tracker.delete_secret(handle)?;
    }

    for (key, value) in assignments {
        match tracker.find_by_key(&key) {
            Some(handle) => {
                tracker.edit_value(handle, value)?;
            }
            None => {
                tracker.add_secret(&key, Some(value));
            }
        }
    }

    for id in &changes.attach {
        let secret = catalog.find_secret(*id).ok_or_else(|| {
            SecretSyncError::CommandFailed(format!("no secret with id {id} to attach"))
        })?;
        tracker.attach_secret(*id, &secret.secret_key);
    }

    Ok(())
}

/// Validate and save a session, record the outcome in the audit log,
/// and print it. Whatever landed is merged into `catalog`. A partial save
/// is returned as an error so the process exits non-zero.
pub async fn save_session<R: RemoteStore>(
    settings: &Settings,
    engine: &ReconcileEngine<R>,
    session: &mut EditSession,
    catalog: &mut Catalog,
) -> Result<SaveReport> {
    let pending = session.pending_changes();
    if pending.total() > 0 {
        output::info(&format!("Saving {pending}"));
    }

    let report = match engine.submit(session, catalog.repositories()).await {
        Ok(report) => report,
        Err(SecretSyncError::AbortedCreate { url, reason }) => {
            audit::log_audit(
                settings,
                "create-repository",
                &url,
                None,
                audit::OUTCOME_FAILED,
                Some(&reason),
            );
            return Err(SecretSyncError::AbortedCreate { url, reason });
        }
        Err(e) => return Err(e),
    };

    catalog.merge_saved(session.original());
    audit::log_report(settings, &report);
    output::print_report(&report);

    if report.is_complete() {
        Ok(report)
    } else {
        Err(SecretSyncError::PartialSave(report.summary()))
    }
}
