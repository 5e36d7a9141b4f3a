use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};

use crate::errors::{Result, SecretSyncError};

const DB_FILE: &str = "audit.db";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS audit_log (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp   TEXT NOT NULL,
    operation   TEXT NOT NULL,
    repository  TEXT NOT NULL,
    secret_key  TEXT,
    outcome     TEXT NOT NULL,
    details     TEXT
);
CREATE INDEX IF NOT EXISTS audit_log_timestamp ON audit_log (timestamp);";

/// One remote operation about to be written.
#[derive(Debug, Clone, Copy)]
pub struct AuditRecord<'a> {
    pub operation: &'a str,
    pub repository: &'a str,
    pub secret_key: Option<&'a str>,
    pub outcome: &'a str,
    pub details: Option<&'a str>,
}

/// A row read back from the log.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub repository: String,
    pub secret_key: Option<String>,
    pub outcome: String,
    pub details: Option<String>,
}

impl AuditEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let stamp: String = row.get("timestamp")?;
        Ok(Self {
            id: row.get("id")?,
            timestamp: DateTime::parse_from_rfc3339(&stamp)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            operation: row.get("operation")?,
            repository: row.get("repository")?,
            secret_key: row.get("secret_key")?,
            outcome: row.get("outcome")?,
            details: row.get("details")?,
        })
    }
}

pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open `<state_dir>/audit.db`, creating the directory, the file
    /// (owner-only on Unix) and the table as needed.
    pub fn open(state_dir: &Path) -> Result<Self> {
        fs::create_dir_all(state_dir)?;
        let path = Self::db_path(state_dir);
        let conn = Connection::open(&path).map_err(db_error("open"))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }

        conn.execute_batch(SCHEMA).map_err(db_error("schema"))?;
        Ok(Self { conn })
    }

    pub fn db_path(state_dir: &Path) -> PathBuf {
        state_dir.join(DB_FILE)
    }

    /// Write `records` in one transaction, all stamped with the same time.
    pub fn append(&mut self, records: &[AuditRecord<'_>]) -> Result<usize> {
        let now = timestamp(Utc::now());
        let tx = self.conn.transaction().map_err(db_error("begin"))?;
        {
            let mut insert = tx
                .prepare_cached(
                    "INSERT INTO audit_log
                        (timestamp, operation, repository, secret_key, outcome, details)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(db_error("prepare insert"))?;
            for r in records {
                insert
                    .execute(params![
                        now,
                        r.operation,
                        r.repository,
                        r.secret_key,
                        r.outcome,
                        r.details
                    ])
                    .map_err(db_error("insert"))?;
            }
        }
        tx.commit().map_err(db_error("commit"))?;
        Ok(records.len())
    }

    /// Newest first, at most `limit`, optionally only from `since` on.
    pub fn recent(&self, limit: usize, since: Option<DateTime<Utc>>) -> Result<Vec<AuditEntry>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, operation, repository, secret_key, outcome, details
                 FROM audit_log
                 WHERE ?1 IS NULL OR timestamp >= ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )
            .map_err(db_error("prepare query"))?;

        let since = since.map(timestamp);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![since, limit], AuditEntry::from_row)
            .map_err(db_error("query"))?;
        let entries = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_error("read row"))?;
        Ok(entries)
    }
}

// Fixed width, so text order matches time order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn db_error(step: &'static str) -> impl Fn(rusqlite::Error) -> SecretSyncError {
    move |e| SecretSyncError::AuditError(format!("{step}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record<'a>(operation: &'a str, key: Option<&'a str>, outcome: &'a str) -> AuditRecord<'a> {
        AuditRecord {
            operation,
            repository: "git@github.com:acme/api.git",
            secret_key: key,
            outcome,
            details: None,
        }
    }

    #[test]
    fn open_creates_state_dir_and_database() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join(".secretsync");
        AuditLog::open(&state).unwrap();
        assert!(AuditLog::db_path(&state).exists());
    }

    #[test]
    fn save_report_is_written_and_read_back_newest_first() {
        let dir = TempDir::new().unwrap();
        let mut log = AuditLog::open(dir.path()).unwrap();

        let failed = AuditRecord {
            details: Some("PUT /secret/4 returned HTTP 500"),
            ..record("update-secret", Some("DB_URL"), "failed")
        };
        let written = log
            .append(&[
                record("create-repository", None, "ok"),
                record("create-secret", Some("TOKEN"), "ok"),
                failed,
            ])
            .unwrap();
        assert_eq!(written, 3);

        let entries = log.recent(10, None).unwrap();
        let ops: Vec<&str> = entries.iter().map(|e| e.operation.as_str()).collect();
        assert_eq!(ops, ["update-secret", "create-secret", "create-repository"]);
        assert_eq!(entries[0].outcome, "failed");
        assert_eq!(entries[0].details.as_deref(), Some("PUT /secret/4 returned HTTP 500"));
        assert!(entries[2].secret_key.is_none());
        assert_eq!(entries[1].repository, "git@github.com:acme/api.git");
    }

    #[test]
    fn recent_honours_limit_and_since_together() {
        let dir = TempDir::new().unwrap();
        let mut log = AuditLog::open(dir.path()).unwrap();
        let keys: Vec<String> = (0..6).map(|i| format!("KEY_{i}")).collect();
        let records: Vec<AuditRecord<'_>> = keys
            .iter()
            .map(|k| record("delete-secret", Some(k.as_str()), "ok"))
            .collect();
        log.append(&records).unwrap();

        let hour_ago = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(log.recent(4, Some(hour_ago)).unwrap().len(), 4);
        assert_eq!(log.recent(4, None).unwrap()[0].secret_key.as_deref(), Some("KEY_5"));

        let later = Utc::now() + chrono::Duration::hours(1);
        assert!(log.recent(10, Some(later)).unwrap().is_empty());
    }

    #[test]
    fn unusable_state_dir_is_an_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, "").unwrap();
        assert!(AuditLog::open(&file.join("state")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn database_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        AuditLog::open(dir.path()).unwrap();
        let mode = std::fs::metadata(AuditLog::db_path(dir.path()))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
