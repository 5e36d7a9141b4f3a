//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::model::{ChangeStatus, Repository};
use crate::reconcile::SaveReport;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Table of repositories (Id, Url, Kind, Secrets).
pub fn print_repositories_table(repositories: &[Repository]) {
    if repositories.is_empty() {
        info("No repositories registered yet.");
        tip("Run `secretsync add <URL>` to register one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Url", "Kind", "Secrets"]);

    for repo in repositories {
        table.add_row(vec![
            repo.id.to_string(),
            repo.url.clone(),
            repo.kind().to_string(),
            repo.visible_secrets().count().to_string(),
        ]);
    }

    println!("{table}");
}

/// Table of a repository's visible secrets (Id, Key, Status). Values are
/// never printed.
pub fn print_secrets_table(repository: &Repository) {
    if repository.visible_secrets().next().is_none() {
        info("No secrets in this repository yet.");
        tip(&format!(
            "Run `secretsync edit {} --set KEY=VALUE` to add one.",
            repository.id
        ));
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Key", "Status"]);

    for secret in repository.visible_secrets() {
        let id = if secret.is_persisted() {
            secret.id.to_string()
        } else {
            "-".to_string()
        };
        table.add_row(vec![
            id,
            secret.secret_key.clone(),
            colorize_status(secret.status()),
        ]);
    }

    println!("{table}");
}

fn colorize_status(status: ChangeStatus) -> String {
    let label = status.as_str();
    match status {
        ChangeStatus::None => style(label).dim().to_string(),
        ChangeStatus::Created | ChangeStatus::Added => style(label).green().to_string(),
        ChangeStatus::Modified => style(label).blue().to_string(),
        ChangeStatus::Deleted => style(label).red().to_string(),
    }
}

/// Print the outcome of a save: each failure, then the summary line.
pub fn print_report(report: &SaveReport) {
    for failure in report.failures() {
        error(&failure.to_string());
    }

    if report.is_complete() {
        success(&report.summary());
    } else {
        warning(&report.summary());
        tip("Failed changes are kept; fix the cause and run the command again.");
    }
}
