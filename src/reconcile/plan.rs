//! Pure diff between a snapshot and its working copy.
//!
//! `plan` decides which remote operations a save needs and in which
//! phase they run. It never touches the network, so the diff can be
//! checked on its own.

use std::fmt;

use crate::model::{ChangeStatus, Repository, SecretHandle};

/// Every kind of remote operation a save can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CreateRepository,
    UpdateRepository,
    DeleteSecret,
    CreateSecret,
    UpdateSecret,
    AttachSecret,
}

impl OperationKind {
    pub fn is_secret_operation(self) -> bool {
        !matches!(self, Self::CreateRepository | Self::UpdateRepository)
    }

    /// Stable name used in logs and the audit trail.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateRepository => "create-repository",
            Self::UpdateRepository => "update-repository",
            Self::DeleteSecret => "delete-secret",
            Self::CreateSecret => "create-secret",
            Self::UpdateSecret => "update-secret",
            Self::AttachSecret => "attach-secret",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which call to make for a secret in the create/update phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Create,
    Update,
    Attach,
}

impl UpsertKind {
    pub fn operation(self) -> OperationKind {
        match self {
            Self::Create => OperationKind::CreateSecret,
            Self::Update => OperationKind::UpdateSecret,
            Self::Attach => OperationKind::AttachSecret,
        }
    }
}

/// A tombstone to delete remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteStep {
    pub handle: SecretHandle,
    pub id: i64,
    pub secret_key: String,
}

/// A secret to create, update, or attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertStep {
    pub handle: SecretHandle,
    pub kind: UpsertKind,
    pub secret_key: String,
}

/// Ordered operations implied by one save.
///
/// Phases run in field order: repository creation, deletes (strictly
/// sequential), upserts (joined, possibly concurrent), url update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavePlan {
    pub create_repository: bool,
    pub deletes: Vec<DeleteStep>,
    pub upserts: Vec<UpsertStep>,
    pub url_update: Option<String>,
}

impl SavePlan {
    pub fn is_empty(&self) -> bool {
        self.operation_count() == 0
    }

    pub fn operation_count(&self) -> usize {
        usize::from(self.create_repository)
            + self.deletes.len()
            + self.upserts.len()
            + usize::from(self.url_update.is_some())
    }
}

/// Compute the operations needed to bring the store in line with
/// `selected`.
pub fn plan(selected: &Repository, original: &Repository) -> SavePlan {
    if selected.is_new {
        return plan_new(selected);
    }

    let deletes = selected
        .secrets
        .iter()
        .filter(|s| s.is_deleted())
        .map(|s| DeleteStep {
            handle: s.handle,
            id: s.id,
            secret_key: s.secret_key.clone(),
        })
        .collect();

    let upserts = selected
        .secrets
        .iter()
        .filter_map(|s| {
            // No value and nothing to attach: nothing to send.
            if !s.has_value() && s.status() != ChangeStatus::Added {
                return None;
            }
            let kind = match s.status() {
                ChangeStatus::Created => UpsertKind::Create,
                ChangeStatus::Modified => UpsertKind::Update,
                ChangeStatus::Added => UpsertKind::Attach,
                ChangeStatus::None | ChangeStatus::Deleted => return None,
            };
            Some(UpsertStep {
                handle: s.handle,
                kind,
                secret_key: s.secret_key.clone(),
            })
        })
        .collect();

    let url_update = (selected.url != original.url).then(|| selected.url.clone());

    SavePlan {
        create_repository: false,
        deletes,
        upserts,
        url_update,
    }
}

/// A new repository: create it, then every secret in sequence order.
fn plan_new(selected: &Repository) -> SavePlan {
    let upserts = selected
        .secrets
        .iter()
        .filter(|s| !s.is_deleted())
        .map(|s| UpsertStep {
            handle: s.handle,
            kind: if s.status() == ChangeStatus::Added {
                UpsertKind::Attach
            } else {
                UpsertKind::Create
            },
            secret_key: s.secret_key.clone(),
        })
        .collect();

    SavePlan {
        create_repository: true,
        deletes: Vec::new(),
        upserts,
        url_update: None,
    }
}
