//! Integration tests for the secretsync CLI.
//!
//! These run the binary end-to-end with `assert_cmd` against an
//! in-process HTTP store. Prompts need a terminal, so only the
//! flag-driven paths are covered here.

mod common;

use assert_cmd::Command;
use assert_fs::TempDir;
use common::FakeStore;
use predicates::prelude::*;

/// Helper: get a Command pointing at the secretsync binary.
fn secretsync() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("secretsync").expect("binary should exist");
    cmd.env_remove("SECRETSYNC_SERVER").env_remove("RUST_LOG");
    cmd
}

/// Helper: a command run inside `dir` against the store at `server`.
fn against(dir: &TempDir, server: &str) -> Command {
    let mut cmd = secretsync();
    cmd.current_dir(dir.path()).env("SECRETSYNC_SERVER", server);
    cmd
}

#[test]
fn help_flag_shows_usage() {
    secretsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync exactly what changed"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("add"))
        .stdout(predicate::str::contains("edit"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("audit"));
}

#[test]
fn version_flag_shows_version() {
    secretsync()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("secretsync"));
}

#[test]
fn no_args_shows_help() {
    secretsync()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn edit_help_lists_change_flags() {
    secretsync()
        .args(["edit", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--set"))
        .stdout(predicate::str::contains("--unset"))
        .stdout(predicate::str::contains("--attach"))
        .stdout(predicate::str::contains("--from-file"))
        .stdout(predicate::str::contains("--url"));
}

#[test]
fn completions_are_generated_for_bash() {
    secretsync()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("secretsync"));
}

#[test]
fn completions_reject_unknown_shell() {
    secretsync()
        .args(["completions", "csh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown shell"));
}

#[test]
fn unreachable_server_fails_cleanly() {
    let tmp = TempDir::new().unwrap();
    against(&tmp, "http://127.0.0.1:9/api")
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("transport error"));
}

#[test]
fn list_and_show_never_print_values() {
    let store = FakeStore::new();
    store.seed_repository("git@github.com:acme/api.git", &[("TOKEN", "s3cr3t-value")]);
    let server = store.serve_in_background();
    let tmp = TempDir::new().unwrap();

    against(&tmp, &server)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("git@github.com:acme/api.git"))
        .stdout(predicate::str::contains("GitHub"));

    against(&tmp, &server)
        .args(["show", "git@github.com:acme/api.git"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TOKEN"))
        .stdout(predicate::str::contains("s3cr3t-value").not());
}

#[test]
fn show_unknown_repository_fails() {
    let store = FakeStore::new();
    let server = store.serve_in_background();
    let tmp = TempDir::new().unwrap();

    against(&tmp, &server)
        .args(["show", "999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn add_creates_repository_with_secrets() {
    let store = FakeStore::new();
    let server = store.serve_in_background();
    let tmp = TempDir::new().unwrap();

    against(&tmp, &server)
        .args([
            "add",
            "git@example.com/x",
            "--set",
            "TOKEN=abc",
            "--set",
            "DB_URL=postgres://db",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("created with 2 secret(s)"))
        .stdout(predicate::str::contains("to see its 2 secret(s)."));

    let id = store.repository_id("git@example.com/x").unwrap();
    assert_eq!(store.secret_value(id, "TOKEN").as_deref(), Some("abc"));
    assert_eq!(store.secret_value(id, "DB_URL").as_deref(), Some("postgres://db"));
}

#[test]
fn add_with_taken_url_fails_validation() {
    let store = FakeStore::new();
    store.seed_repository("git@example.com/x", &[]);
    let server = store.serve_in_background();
    let tmp = TempDir::new().unwrap();

    against(&tmp, &server)
        .args(["add", "git@example.com/x", "--set", "TOKEN=abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(store.repository_count(), 1);
    assert_eq!(store.requests(), vec!["GET /repository/list"]);
}

#[test]
fn malformed_assignment_is_rejected() {
    let store = FakeStore::new();
    let server = store.serve_in_background();
    let tmp = TempDir::new().unwrap();

    against(&tmp, &server)
        .args(["add", "u", "--set", "NO_EQUALS"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected KEY=VALUE"));
}

#[test]
fn edit_applies_unset_and_set_flags() {
    let store = FakeStore::new();
    let id = store.seed_repository("u", &[("A", "1"), ("B", "2")]);
    let server = store.serve_in_background();
    let tmp = TempDir::new().unwrap();

    against(&tmp, &server)
        .args(["edit", "u", "--unset", "A", "--set", "B=2b", "--set", "C=3"])
        .assert()
        .success();

    assert!(store.secret_id(id, "A").is_none());
    assert_eq!(store.secret_value(id, "B").as_deref(), Some("2b"));
    assert_eq!(store.secret_value(id, "C").as_deref(), Some("3"));
}

#[test]
fn edit_reads_assignments_from_file() {
    let store = FakeStore::new();
    let id = store.seed_repository("u", &[]);
    let server = store.serve_in_background();
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("prod.env"), "export API_KEY=\"k-1\"\n# note\nREGION=eu\n")
        .unwrap();

    against(&tmp, &server)
        .args(["edit", &id.to_string(), "--from-file", "prod.env"])
        .assert()
        .success();

    assert_eq!(store.secret_value(id, "API_KEY").as_deref(), Some("k-1"));
    assert_eq!(store.secret_value(id, "REGION").as_deref(), Some("eu"));
}

#[test]
fn edit_partial_failure_exits_non_zero() {
    let store = FakeStore::new();
    let id = store.seed_repository("u", &[("A", "1"), ("B", "2")]);
    let b_id = store.secret_id(id, "B").unwrap();
    store.fail_on(&format!("PUT /secret/{b_id}"));
    let server = store.serve_in_background();
    let tmp = TempDir::new().unwrap();

    against(&tmp, &server)
        .args(["edit", "u", "--set", "A=1b", "--set", "B=2b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("update-secret 'B'"))
        .stderr(predicate::str::contains("1 of 2 secret operations failed"));

    assert_eq!(store.secret_value(id, "A").as_deref(), Some("1b"));
    assert_eq!(store.secret_value(id, "B").as_deref(), Some("2"));
}

#[test]
fn edit_without_flags_needs_a_terminal() {
    let store = FakeStore::new();
    store.seed_repository("u", &[]);
    let server = store.serve_in_background();
    let tmp = TempDir::new().unwrap();

    against(&tmp, &server)
        .args(["edit", "u"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to change"));
}

#[test]
fn edit_attach_shares_existing_secret() {
    let store = FakeStore::new();
    let first = store.seed_repository("one", &[("SHARED", "v")]);
    let second = store.seed_repository("two", &[]);
    let shared = store.secret_id(first, "SHARED").unwrap();
    let server = store.serve_in_background();
    let tmp = TempDir::new().unwrap();

    against(&tmp, &server)
        .args(["edit", "two", "--attach", &shared.to_string()])
        .assert()
        .success();

    assert_eq!(store.secret_value(second, "SHARED").as_deref(), Some("v"));
}

#[test]
fn verify_reads_candidate_from_stdin() {
    let store = FakeStore::new();
    store.seed_repository("u", &[("TOKEN", "abc")]);
    let server = store.serve_in_background();
    let tmp = TempDir::new().unwrap();

    against(&tmp, &server)
        .args(["verify", "u", "TOKEN"])
        .write_stdin("abc\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("matches"));

    against(&tmp, &server)
        .args(["verify", "u", "TOKEN"])
        .write_stdin("wrong\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Secret value is wrong"));
}

#[test]
fn delete_with_force_removes_repository() {
    let store = FakeStore::new();
    store.seed_repository("u", &[("A", "1")]);
    let server = store.serve_in_background();
    let tmp = TempDir::new().unwrap();

    against(&tmp, &server)
        .args(["delete", "u", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted repository 'u'"))
        .stdout(predicate::str::contains("0 repositories left."));

    assert_eq!(store.repository_count(), 0);
}

#[cfg(feature = "audit-log")]
#[test]
fn audit_without_history_is_empty() {
    let tmp = TempDir::new().unwrap();
    secretsync()
        .current_dir(tmp.path())
        .arg("audit")
        .assert()
        .success()
        .stdout(predicate::str::contains("No audit entries found"));
}

#[cfg(feature = "audit-log")]
#[test]
fn saves_are_recorded_in_audit_log() {
    let store = FakeStore::new();
    let server = store.serve_in_background();
    let tmp = TempDir::new().unwrap();

    against(&tmp, &server)
        .args(["add", "git@example.com/x", "--set", "TOKEN=abc"])
        .assert()
        .success();

    assert!(tmp.path().join(".secretsync").join("audit.db").exists());

    secretsync()
        .current_dir(tmp.path())
        .args(["audit", "--since", "1h"])
        .assert()
        .success()
        .stdout(predicate::str::contains("create-repository"))
        .stdout(predicate::str::contains("create-secret"))
        .stdout(predicate::str::contains("TOKEN"))
        .stdout(predicate::str::contains("abc").not());
}
