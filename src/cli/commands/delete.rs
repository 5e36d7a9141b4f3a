//! `secretsync delete` — remove a repository from the store.

use dialoguer::Confirm;

use crate::audit;
use crate::catalog::Catalog;
use crate::cli::{load_settings, output, remote_store, Cli};
use crate::errors::{Result, SecretSyncError};
use crate::remote::RemoteStore;

/// Execute the `delete` command.
pub async fn execute(cli: &Cli, repo: &str, force: bool) -> Result<()> {
    let settings = load_settings(cli)?;
    let remote = remote_store(&settings)?;
    let mut catalog = Catalog::load(&remote).await?;
    let repository = catalog.get(repo)?.clone();

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete repository '{}' and detach its {} secret(s)?",
                repository.url,
                repository.visible_secrets().count()
            ))
            .default(false)
            .interact()
            .map_err(|e| SecretSyncError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    match remote.delete_repository(repository.id).await {
        Ok(()) => {
            audit::log_audit(
                &settings,
                "delete-repository",
                &repository.url,
                None,
                audit::OUTCOME_OK,
                None,
            );
            catalog.remove(repository.id);
            output::success(&format!("Deleted repository '{}'", repository.url));
            let left = catalog.repositories().len();
            output::tip(&format!(
                "{left} repositor{} left.",
                if left == 1 { "y" } else { "ies" }
            ));
            Ok(())
        }
        Err(e) => {
            let reason = e.to_string();
            audit::log_audit(
                &settings,
                "delete-repository",
                &repository.url,
                None,
                audit::OUTCOME_FAILED,
                Some(&reason),
            );
            Err(e.into())
        }
    }
}
