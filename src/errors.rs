use thiserror::Error;

use crate::model::{ChangeEvent, ChangeStatus};
use crate::remote::RemoteError;
use crate::validate::ValidationErrors;

/// All errors that can occur in secretsync.
#[derive(Debug, Error)]
pub enum SecretSyncError {
    // --- Session errors ---
    #[error("Cannot {event} secret '{key}' while it is {status}")]
    IllegalTransition {
        key: String,
        status: ChangeStatus,
        event: ChangeEvent,
    },

    #[error("Secret is not part of this edit session")]
    UnknownSecret,

    // --- Validation errors (nothing was sent) ---
    #[error("{0}")]
    Validation(ValidationErrors),

    // --- Reconciliation errors ---
    #[error("Failed to create repository '{url}': {reason}")]
    AbortedCreate { url: String, reason: String },

    #[error("Save incomplete: {0}")]
    PartialSave(String),

    // --- Remote store errors ---
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Repository '{0}' not found")]
    RepositoryNotFound(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- Audit errors ---
    #[error("Audit error: {0}")]
    AuditError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

impl From<ValidationErrors> for SecretSyncError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Convenience type alias for secretsync results.
pub type Result<T> = std::result::Result<T, SecretSyncError>;
