//! `secretsync audit` — display the audit log.
//!
//! Usage:
//!   secretsync audit               # last 50 entries
//!   secretsync audit --since 24h   # entries from the last day

use chrono::{DateTime, Utc};

use crate::cli::Cli;
use crate::errors::{Result, SecretSyncError};

/// Execute the `audit` command.
#[cfg(feature = "audit-log")]
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    use crate::audit::AuditLog;
    use crate::cli::{load_settings, output};

    let settings = load_settings(cli)?;
    let cwd = std::env::current_dir()?;
    let state_dir = settings.state_path(&cwd);

    if !AuditLog::db_path(&state_dir).exists() {
        output::info("No audit entries found.");
        return Ok(());
    }

    let since_dt = since.map(parse_since).transpose()?;
    let entries = AuditLog::open(&state_dir)?.recent(last, since_dt)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    print_audit_table(&entries);
    Ok(())
}

#[cfg(not(feature = "audit-log"))]
pub fn execute(_cli: &Cli, _last: usize, since: Option<&str>) -> Result<()> {
    since.map(parse_since).transpose()?;
    Err(SecretSyncError::AuditError(
        "this build has no audit log (enable the `audit-log` feature)".into(),
    ))
}

/// Parse "7d", "24h" or "30m" into the instant that long ago.
fn parse_since(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let invalid = || {
        SecretSyncError::CommandFailed(format!(
            "invalid duration '{input}' (use a form like 7d, 24h, or 30m)"
        ))
    };

    let mut chars = input.chars();
    let unit = chars.next_back().ok_or_else(invalid)?;
    let num: i64 = chars.as_str().parse().map_err(|_| invalid())?;

    let duration = match unit {
        'd' => chrono::Duration::days(num),
        'h' => chrono::Duration::hours(num),
        'm' => chrono::Duration::minutes(num),
        _ => return Err(invalid()),
    };

    Ok(Utc::now() - duration)
}

#[cfg(feature = "audit-log")]
fn print_audit_table(entries: &[crate::audit::AuditEntry]) {
    use comfy_table::{ContentArrangement, Table};
    use console::style;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Time",
        "Operation",
        "Repository",
        "Key",
        "Outcome",
        "Details",
    ]);

    for entry in entries {
        let outcome = if entry.outcome == crate::audit::OUTCOME_OK {
            style(&entry.outcome).green().to_string()
        } else {
            style(&entry.outcome).red().to_string()
        };
        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            colorize_operation(&entry.operation),
            entry.repository.clone(),
            entry.secret_key.as_deref().unwrap_or("-").to_string(),
            outcome,
            entry.details.as_deref().unwrap_or("-").to_string(),
        ]);
    }

    println!(
        "{}",
        style(format!("{} audit entries:", entries.len())).bold()
    );
    println!("{table}");
}

#[cfg(feature = "audit-log")]
fn colorize_operation(op: &str) -> String {
    use console::style;

    match op {
        "create-repository" | "create-secret" => style(op).green().to_string(),
        "update-repository" | "update-secret" => style(op).blue().to_string(),
        "delete-repository" | "delete-secret" => style(op).red().to_string(),
        "attach-secret" => style(op).cyan().to_string(),
        "verify-secret" => style(op).magenta().to_string(),
        _ => op.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_since_units() {
        let days = Utc::now() - parse_since("7d").unwrap();
        assert!((days.num_days() - 7).abs() <= 1);

        let hours = Utc::now() - parse_since("24h").unwrap();
        assert!((hours.num_hours() - 24).abs() <= 1);

        let minutes = Utc::now() - parse_since("30m").unwrap();
        assert!((minutes.num_minutes() - 30).abs() <= 1);
    }

    #[test]
    fn parse_since_invalid() {
        assert!(parse_since("abc").is_err());
        assert!(parse_since("7x").is_err());
        assert!(parse_since("d").is_err());
        assert!(parse_since("").is_err());
    }
}
