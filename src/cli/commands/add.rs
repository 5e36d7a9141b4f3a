//! `secretsync add` — register a new repository with its secrets.

use crate::catalog::Catalog;
use crate::cli::commands::{apply_changes, save_session};
use crate::cli::{engine, load_settings, output, Cli, SecretChanges};
use crate::errors::Result;
use crate::session::EditSession;

/// Execute the `add` command.
pub async fn execute(cli: &Cli, url: &str, changes: &SecretChanges) -> Result<()> {
    let settings = load_settings(cli)?;
    let engine = engine(&settings)?;
    let mut catalog = Catalog::load(engine.remote()).await?;

    let mut session = EditSession::begin_new();
    session.tracker().set_url(url);
    apply_changes(&mut session, &catalog, &[], changes)?;

    let report = save_session(&settings, &engine, &mut session, &mut catalog).await?;
    let saved = catalog.get(&report.repository_id.to_string())?;
    output::tip(&format!(
        "Run `secretsync show {}` to see its {} secret(s).",
        saved.id,
        saved.secrets.len()
    ));

    Ok(())
}
