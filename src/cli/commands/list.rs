//! `secretsync list` — display all repositories in a table.

use crate::catalog::Catalog;
use crate::cli::{load_settings, output, remote_store, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub async fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let remote = remote_store(&settings)?;
    let catalog = Catalog::load(&remote).await?;

    output::info(&format!(
        "{} — {} repositor{}",
        settings.server_url,
        catalog.repositories().len(),
        if catalog.repositories().len() == 1 { "y" } else { "ies" }
    ));
    output::print_repositories_table(catalog.repositories());

    Ok(())
}
