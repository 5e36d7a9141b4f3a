//! `secretsync show` — list the secrets of one repository.

use crate::catalog::Catalog;
use crate::cli::{load_settings, output, remote_store, Cli};
use crate::errors::Result;

/// Execute the `show` command.
pub async fn execute(cli: &Cli, repo: &str) -> Result<()> {
    let settings = load_settings(cli)?;
    let remote = remote_store(&settings)?;
    let catalog = Catalog::load(&remote).await?;
    let repository = catalog.get(repo)?;

    output::info(&format!(
        "{} (id {}, {}) — {} secret(s)",
        repository.url,
        repository.id,
        repository.kind(),
        repository.visible_secrets().count()
    ));
    output::print_secrets_table(repository);

    Ok(())
}
