//! Menu-driven edit session for `secretsync edit` on a terminal.
//!
//! Every action goes through the session's `ChangeTracker`; nothing is
//! sent until the user picks "Save".

use dialoguer::{Confirm, Input, Password, Select};

use crate::catalog::Catalog;
use crate::cli::output;
use crate::errors::{Result, SecretSyncError};
use crate::model::{ChangeStatus, Secret, SecretHandle};
use crate::session::EditSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    Save,
    Cancel,
}

const ACTIONS: &[&str] = &[
    "Add secret",
    "Edit value",
    "Rename key",
    "Delete secret",
    "Attach existing secret",
    "Change url",
    "Show pending changes",
    "Revert all changes",
    "Save",
    "Cancel",
];

/// Run the menu until the user saves or cancels.
pub fn run(session: &mut EditSession, catalog: &Catalog) -> Result<MenuOutcome> {
    loop {
        output::print_secrets_table(session.selected());

        let choice = Select::new()
            .with_prompt(format!("Editing {}", session.selected().url))
            .items(ACTIONS)
            .default(0)
            .interact()
            .map_err(prompt_error)?;

        // Tracker rejections are reported and the menu continues.
        let step = match ACTIONS[choice] {
            "Add secret" => add_secret(session),
            "Edit value" => edit_value(session),
            "Rename key" => rename_key(session),
            "Delete secret" => delete_secret(session),
            "Attach existing secret" => attach_secret(session, catalog),
            "Change url" => change_url(session),
            "Show pending changes" => {
                output::info(&session.pending_changes().to_string());
                Ok(())
            }
            "Revert all changes" => {
                session.revert();
                output::info("All changes reverted.");
                Ok(())
            }
            "Save" => return Ok(MenuOutcome::Save),
            _ => {
                if !session.has_changes() || confirm("Discard pending changes?")? {
                    return Ok(MenuOutcome::Cancel);
                }
                Ok(())
            }
        };

        if let Err(e) = step {
            output::error(&e.to_string());
        }
    }
}

fn add_secret(session: &mut EditSession) -> Result<()> {
    let key = input("Key")?;
    let value = secret_value(&key)?;
    let mut tracker = session.tracker();
    tracker.add_secret(&key, Some(value));
    Ok(())
}

fn edit_value(session: &mut EditSession) -> Result<()> {
    let Some(handle) = pick_secret(session, "Secret to edit")? else {
        return Ok(());
    };
    let key = key_of(session, handle);
    let value = secret_value(&key)?;
    let status = session.tracker().edit_value(handle, value)?;
    output::success(&format!("'{key}' is now {status}"));
    Ok(())
}

fn rename_key(session: &mut EditSession) -> Result<()> {
    if choices(session, renamable).is_empty() {
        output::info("Only secrets added in this session can be renamed.");
        output::tip("To rename a stored secret, delete it and add it again under the new key.");
        return Ok(());
    }
    let Some(handle) = pick(session, "Secret to rename", renamable)? else {
        return Ok(());
    };
    let key = input("New key")?;
    let conflicts = session.tracker().edit_key(handle, &key)?;
    if !conflicts.is_empty() {
        output::warning(&format!(
            "Key '{key}' is used by another secret; saving will fail until one is renamed."
        ));
    }
    Ok(())
}

fn delete_secret(session: &mut EditSession) -> Result<()> {
    let Some(handle) = pick_secret(session, "Secret to delete")? else {
        return Ok(());
    };
    session.tracker().delete_secret(handle)?;
    Ok(())
}

fn attach_secret(session: &mut EditSession, catalog: &Catalog) -> Result<()> {
    let own = session.selected().id;
    let candidates: Vec<(i64, String, String)> = catalog
        .repositories()
        .iter()
        .filter(|r| r.id != own)
        .flat_map(|r| {
            r.visible_secrets()
                .map(move |s| (s.id, s.secret_key.clone(), r.url.clone()))
        })
        .collect();

    if candidates.is_empty() {
        output::info("No secrets in other repositories to attach.");
        return Ok(());
    }

    let labels: Vec<String> = candidates
        .iter()
        .map(|(id, key, url)| format!("{key} (#{id}, from {url})"))
        .collect();
    let choice = Select::new()
        .with_prompt("Secret to attach")
        .items(&labels)
        .interact()
        .map_err(prompt_error)?;

    let (id, key, _) = &candidates[choice];
    session.tracker().attach_secret(*id, key);
    Ok(())
}

fn change_url(session: &mut EditSession) -> Result<()> {
    let url: String = Input::<String>::new()
        .with_prompt("Url")
        .with_initial_text(session.selected().url.clone())
        .interact_text()
        .map_err(prompt_error)?;
    session.tracker().set_url(&url);
    Ok(())
}

/// A stored secret's new key is never sent on its own, so only secrets
/// not yet in the store are offered for renaming.
fn renamable(secret: &Secret) -> bool {
    secret.status() == ChangeStatus::Created
}

/// Visible secrets accepted by `filter`, labelled for a menu.
fn choices(session: &EditSession, filter: fn(&Secret) -> bool) -> Vec<(SecretHandle, String)> {
    session
        .selected()
        .visible_secrets()
        .filter(|s| filter(s))
        .map(|s| (s.handle, format!("{} [{}]", s.secret_key, s.status())))
        .collect()
}

fn pick_secret(session: &EditSession, prompt: &str) -> Result<Option<SecretHandle>> {
    pick(session, prompt, |_| true)
}

/// Let the user choose one secret. Returns its handle, so later edits
/// stay attached to the same secret whatever the list order.
fn pick(
    session: &EditSession,
    prompt: &str,
    filter: fn(&Secret) -> bool,
) -> Result<Option<SecretHandle>> {
    let visible = choices(session, filter);

    if visible.is_empty() {
        output::info("No secrets to choose from.");
        return Ok(None);
    }

    let labels: Vec<&str> = visible.iter().map(|(_, label)| label.as_str()).collect();
    let choice = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .interact_opt()
        .map_err(prompt_error)?;

    Ok(choice.map(|i| visible[i].0))
}

fn key_of(session: &EditSession, handle: SecretHandle) -> String {
    session
        .selected()
        .secret(handle)
        .map(|s| s.secret_key.clone())
        .unwrap_or_default()
}

fn input(prompt: &str) -> Result<String> {
    Input::<String>::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(prompt_error)
}

fn secret_value(key: &str) -> Result<String> {
    Password::new()
        .with_prompt(format!("Value for {key}"))
        .allow_empty_password(true)
        .interact()
        .map_err(prompt_error)
}

fn confirm(prompt: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(prompt_error)
}

fn prompt_error(e: dialoguer::Error) -> SecretSyncError {
    SecretSyncError::CommandFailed(format!("prompt: {e}"))
}
