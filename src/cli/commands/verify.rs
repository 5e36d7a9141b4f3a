//! `secretsync verify` — check a candidate value against a stored secret.
//!
//! The value is prompted for (hidden input) on a terminal, or read from
//! the first line of stdin otherwise, so it never appears in shell history.

use std::io::{BufRead, IsTerminal};

use zeroize::Zeroizing;

use crate::audit;
use crate::catalog::Catalog;
use crate::cli::{load_settings, output, remote_store, Cli};
use crate::errors::{Result, SecretSyncError};
use crate::remote::{RemoteError, RemoteStore, SecretPayload};

/// Execute the `verify` command.
pub async fn execute(cli: &Cli, repo: &str, key: &str) -> Result<()> {
    let settings = load_settings(cli)?;
    let remote = remote_store(&settings)?;
    let catalog = Catalog::load(&remote).await?;
    let repository = catalog.get(repo)?;

    let secret = repository.find_by_key(key).ok_or_else(|| {
        SecretSyncError::CommandFailed(format!(
            "repository '{}' has no secret named '{key}'",
            repository.url
        ))
    })?;

    let candidate = read_candidate(key)?;
    let payload = SecretPayload {
        id: secret.id,
        secret_key: &secret.secret_key,
        secret_value: Some(candidate.as_str()),
        repository_id: repository.id,
    };

    let result = remote.verify_secret(&payload).await;
    let outcome = if result.is_ok() {
        audit::OUTCOME_OK
    } else {
        audit::OUTCOME_FAILED
    };
    audit::log_audit(
        &settings,
        "verify-secret",
        &repository.url,
        Some(key),
        outcome,
        None,
    );

    match result {
        Ok(()) => {
            output::success(&format!("Secret '{key}' matches"));
            Ok(())
        }
        // The store answers a mismatch with a non-2xx status.
        Err(RemoteError::Status { .. }) => Err(SecretSyncError::CommandFailed(format!(
            "Secret value is wrong for '{key}'"
        ))),
        Err(e) => Err(e.into()),
    }
}

fn read_candidate(key: &str) -> Result<Zeroizing<String>> {
    if std::io::stdin().is_terminal() {
        let value = dialoguer::Password::new()
            .with_prompt(format!("Value to check for {key}"))
            .allow_empty_password(true)
            .interact()
            .map_err(|e| SecretSyncError::CommandFailed(format!("value prompt: {e}")))?;
        return Ok(Zeroizing::new(value));
    }

    let mut line = Zeroizing::new(String::new());
    std::io::stdin().lock().read_line(&mut line)?;
    let trimmed = line.trim_end_matches(&['\r', '\n'][..]).len();
    line.truncate(trimmed);
    Ok(line)
}
