//! Model module — the entities an edit session works on.
//!
//! This module provides:
//! - `Repository` and `RepositoryKind` (`repository`)
//! - `Secret` and its session-local `SecretHandle` (`secret`)
//! - The per-secret `ChangeStatus` state machine (`status`)

pub mod repository;
pub mod secret;
pub mod status;

// Re-export the most commonly used items.
pub use repository::{PendingCounts, Repository, RepositoryKind, UNSAVED_ID};
pub use secret::{Secret, SecretHandle};
pub use status::{ChangeEvent, ChangeStatus, Transition};
