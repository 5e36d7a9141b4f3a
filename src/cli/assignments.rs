//! `KEY=VALUE` parsing for `--set` flags and `--from-file` env files.

use std::fs;
use std::path::Path;

use crate::errors::{Result, SecretSyncError};

/// Parse a single `.env` line into a (key, value) pair.
///
/// Returns `None` for blank lines, comments, and lines without `=`.
/// Handles an `export` prefix, double/single quotes, and values
/// containing `=`.
pub fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();

    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);

    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    let value = unquote(value.trim());

    if key.is_empty() {
        return None;
    }

    Some((key, value))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
}

/// Parse one `--set KEY=VALUE` argument. The key is trimmed; the value
/// is kept verbatim so it may contain `=` or surrounding spaces.
pub fn parse_assignment(arg: &str) -> Result<(String, String)> {
    let (key, value) = arg.split_once('=').ok_or_else(|| {
        SecretSyncError::CommandFailed(format!("expected KEY=VALUE, got '{arg}'"))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(SecretSyncError::CommandFailed(format!(
            "missing key in '{arg}'"
        )));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Read an env file into assignments, in file order. A key that
/// appears twice keeps its last value at its first position.
pub fn parse_env_file(path: &Path) -> Result<Vec<(String, String)>> {
    let content = fs::read_to_string(path).map_err(|e| {
        SecretSyncError::CommandFailed(format!("failed to read {}: {e}", path.display()))
    })?;

    let mut assignments: Vec<(String, String)> = Vec::new();
    for (key, value) in content.lines().filter_map(parse_env_line) {
        match assignments.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value.to_string(),
            None => assignments.push((key.to_string(), value.to_string())),
        }
    }
    Ok(assignments)
}
