//! Save-time validation of a working copy.
//!
//! Runs before any remote call. All violations are collected, not just
//! the first one, so the user can fix everything in one pass.

use std::fmt;

use crate::model::{ChangeStatus, Repository};

/// A single business-rule violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    EmptyUrl,
    DuplicateUrl(String),
    EmptyKey,
    DuplicateKey(String),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUrl => f.write_str("Repository url must not be empty"),
            Self::DuplicateUrl(url) => write!(f, "A repository with url '{url}' already exists"),
            Self::EmptyKey => f.write_str("Secrets with an empty key are not allowed"),
            Self::DuplicateKey(key) => write!(f, "Duplicate secret key found: \"{key}\""),
        }
    }
}

/// Non-empty set of violations found in one working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<Violation>);

impl ValidationErrors {
    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    pub fn contains(&self, violation: &Violation) -> bool {
        self.0.contains(violation)
    }

    fn push(&mut self, violation: Violation) {
        if !self.0.contains(&violation) {
            self.0.push(violation);
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Found the following errors:")?;
        for violation in &self.0 {
            writeln!(f, " \u{2022} {violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Normalize then validate `selected` against every known repository.
///
/// This is the gate the engine's callers run before `save`.
pub fn check(selected: &mut Repository, known: &[Repository]) -> Result<(), ValidationErrors> {
    normalize_created_values(selected);
    validate_repository(selected, known)
}

/// Give every `Created` secret without a value an empty value.
///
/// A created secret with no value is accepted and stored as "".
pub fn normalize_created_values(selected: &mut Repository) {
    for secret in &mut selected.secrets {
        if secret.status() == ChangeStatus::Created && !secret.has_value() {
            secret.set_value(String::new());
        }
    }
}

/// Check the working copy without modifying it.
pub fn validate_repository(
    selected: &Repository,
    known: &[Repository],
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors(Vec::new());

    if selected.url.trim().is_empty() {
        errors.push(Violation::EmptyUrl);
    } else {
        // The repository being edited may keep its own url.
        let clashes = known
            .iter()
            .filter(|repo| !(selected.is_persisted() && repo.id == selected.id))
            .filter(|repo| repo.url == selected.url)
            .count();
        if clashes >= 1 {
            errors.push(Violation::DuplicateUrl(selected.url.clone()));
        }
    }

    for (index, secret) in selected.secrets.iter().enumerate() {
        if secret.secret_key.trim().is_empty() {
            errors.push(Violation::EmptyKey);
        }

        // A tombstone frees its key: deletes run before creates.
        if secret.is_deleted() {
            continue;
        }
        let duplicated = selected.secrets[index + 1..]
            .iter()
            .any(|other| !other.is_deleted() && other.secret_key == secret.secret_key);
        if duplicated {
            errors.push(Violation::DuplicateKey(secret.secret_key.clone()));
        }
    }

    if errors.0.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Secret;
    use crate::session::ChangeTracker;

    fn known() -> Vec<Repository> {
        vec![
            Repository::persisted(1, "git@github.com:acme/api.git", Vec::new()),
            Repository::persisted(2, "git@github.com:acme/web.git", Vec::new()),
        ]
    }

    #[test]
    fn accepts_unchanged_existing_repository() {
        let repos = known();
        assert!(validate_repository(&repos[0], &repos).is_ok());
    }

    #[test]
    fn rejects_empty_url() {
        let mut repo = Repository::new_unsaved();
        let err = check(&mut repo, &known()).unwrap_err();
        assert_eq!(err.violations(), &[Violation::EmptyUrl]);
    }

    #[test]
    fn rejects_url_taken_by_another_repository() {
        let repos = known();
        let mut edited = repos[1].clone();
        edited.url = repos[0].url.clone();
        let err = validate_repository(&edited, &repos).unwrap_err();
        assert!(err.contains(&Violation::DuplicateUrl(repos[0].url.clone())));
    }

    #[test]
    fn rejects_new_repository_with_existing_url() {
        let repos = known();
        let mut repo = Repository::new_unsaved();
        repo.url = repos[1].url.clone();
        assert!(validate_repository(&repo, &repos).is_err());
    }

    #[test]
    fn created_secret_without_value_becomes_empty_string() {
        let mut repo = Repository::new_unsaved();
        repo.url = "git@example.com/x".into();
        ChangeTracker::new(&mut repo).add_secret("TOKEN", None);

        check(&mut repo, &known()).unwrap();
        assert_eq!(repo.secrets[0].value(), Some(""));
    }

    #[test]
    fn collects_every_violation() {
        let mut repo = Repository::new_unsaved();
        {
            let mut tracker = ChangeTracker::new(&mut repo);
            tracker.add_secret("", None);
            tracker.add_secret("", None);
            tracker.add_secret("DUP", None);
            tracker.add_secret("DUP", None);
        }
        let err = check(&mut repo, &known()).unwrap_err();
        assert_eq!(
            err.violations(),
            &[
                Violation::EmptyUrl,
                Violation::EmptyKey,
                Violation::DuplicateKey(String::new()),
                Violation::DuplicateKey("DUP".into()),
            ]
        );
    }

    #[test]
    fn deleted_key_can_be_reused() {
        let mut repo = Repository::persisted(
            9,
            "https://gitlab.com/acme/ops",
            vec![Secret::persisted(5, "A", 9)],
        );
        let old = repo.secrets[0].handle;
        {
            let mut tracker = ChangeTracker::new(&mut repo);
            tracker.delete_secret(old).unwrap();
            tracker.add_secret("A", Some("fresh".into()));
        }
        assert!(check(&mut repo, &[]).is_ok());
    }

    #[test]
    fn display_lists_each_violation() {
        let mut repo = Repository::new_unsaved();
        let err = check(&mut repo, &[]).unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("Found the following errors:"));
        assert!(text.contains("Repository url must not be empty"));
    }
}
