use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SecretSyncError};

/// Project-level configuration, loaded from `.secretsync.toml`.
///
/// Every field has a default so the CLI works without a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base url of the store's REST API.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Per-request timeout applied by the HTTP client.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound on concurrent create/update/attach calls during a save.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Directory (relative to project root) for local state such as the audit log.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_server_url() -> String {
    "http://127.0.0.1:8080/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_requests() -> usize {
    8
}

fn default_state_dir() -> String {
    ".secretsync".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrent_requests: default_max_concurrent_requests(),
            state_dir: default_state_dir(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = ".secretsync.toml";

    /// Load settings from `<project_dir>/.secretsync.toml`.
    ///
    /// A missing file yields defaults; an unparsable one is an error.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            SecretSyncError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `max_concurrent_requests`, never below 1.
    pub fn max_in_flight(&self) -> usize {
        self.max_concurrent_requests.max(1)
    }

    /// Full path of the local state directory.
    ///
    /// Example: `project_dir/.secretsync`
    pub fn state_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.state_dir)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
