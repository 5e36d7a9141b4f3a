//! `secretsync edit` — change an existing repository.
//!
//! With change flags the edits are applied and saved in one go. Without
//! any, and on a terminal, an interactive session opens instead.

use crate::catalog::Catalog;
use crate::cli::commands::interactive::{self, MenuOutcome};
use crate::cli::commands::{apply_changes, save_session};
use crate::cli::{engine, is_interactive, load_settings, output, Cli, SecretChanges};
use crate::config::Settings;
use crate::errors::{Result, SecretSyncError};
use crate::reconcile::{ReconcileEngine, SaveReport};
use crate::remote::RemoteStore;
use crate::session::EditSession;

/// Execute the `edit` command.
pub async fn execute(
    cli: &Cli,
    repo: &str,
    url: Option<&str>,
    unset: &[String],
    changes: &SecretChanges,
) -> Result<()> {
    let settings = load_settings(cli)?;
    let engine = engine(&settings)?;
    let mut catalog = Catalog::load(engine.remote()).await?;
    let mut session = EditSession::begin(catalog.get(repo)?.clone());

    let no_flags = url.is_none() && unset.is_empty() && changes.is_empty();
    if no_flags {
        if !is_interactive() {
            return Err(SecretSyncError::CommandFailed(
                "nothing to change: pass --url, --set, --unset, --attach or --from-file".into(),
            ));
        }
        edit_until_saved(&settings, &engine, &mut session, &mut catalog, interactive::run)
            .await?;
        return Ok(());
    }

    if let Some(url) = url {
        session.tracker().set_url(url);
    }
    apply_changes(&mut session, &catalog, unset, changes)?;

    if !session.has_changes() {
        output::info("No changes to save.");
        return Ok(());
    }

    save_session(&settings, &engine, &mut session, &mut catalog).await?;
    Ok(())
}

/// Alternate between `menu` and saving until a save goes through or the
/// user cancels.
///
/// A save rejected by validation, or one that only partly landed, goes
/// back to the menu with the working copy as it was: failed changes keep
/// their pending status and are sent again on the next save.
pub async fn edit_until_saved<R, M>(
    settings: &Settings,
    engine: &ReconcileEngine<R>,
    session: &mut EditSession,
    catalog: &mut Catalog,
    mut menu: M,
) -> Result<Option<SaveReport>>
where
    R: RemoteStore,
    M: FnMut(&mut EditSession, &Catalog) -> Result<MenuOutcome>,
{
    loop {
        if menu(&mut *session, &*catalog)? == MenuOutcome::Cancel {
            output::info("Cancelled. Unsaved changes were discarded.");
            return Ok(None);
        }
        if !session.has_changes() {
            output::info("No changes to save.");
            return Ok(None);
        }

        match save_session(settings, engine, session, catalog).await {
            Ok(report) => return Ok(Some(report)),
            Err(SecretSyncError::Validation(errors)) => {
                output::error(errors.to_string().trim_end());
                output::tip("Nothing was sent. Fix the errors above and save again.");
            }
            Err(SecretSyncError::PartialSave(_)) => {
                output::tip("The failed changes are still pending. Save again to retry them.");
            }
            Err(e) => return Err(e),
        }
    }
}
