//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod assignments;
pub mod commands;
pub mod output;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Args, Parser};

use crate::config::Settings;
use crate::errors::Result;
use crate::reconcile::ReconcileEngine;
use crate::remote::HttpRemoteStore;

/// secretsync CLI: edit repository secrets and sync them with a remote store.
#[derive(Parser)]
#[command(
    name = "secretsync",
    about = "Edit repository secrets and sync exactly what changed with a remote store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Base url of the store API (overrides `server_url` in .secretsync.toml)
    #[arg(long, env = "SECRETSYNC_SERVER", global = true)]
    pub server: Option<String>,

    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// List repositories known to the store
    List,

    /// Show the secrets of one repository (keys only)
    Show {
        /// Repository id or url
        repo: String,
    },

    /// Register a new repository, optionally with secrets
    Add {
        /// Repository url (e.g. git@github.com:acme/api.git)
        url: String,

        #[command(flatten)]
        changes: SecretChanges,
    },

    /// Change an existing repository (interactive when no flags are given)
    Edit {
        /// Repository id or url
        repo: String,

        /// New repository url
        #[arg(long)]
        url: Option<String>,

        /// Remove a secret by key (repeatable)
        #[arg(long = "unset", value_name = "KEY")]
        unset: Vec<String>,

        #[command(flatten)]
        changes: SecretChanges,
    },

    /// Delete a repository
    Delete {
        /// Repository id or url
        repo: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Check a candidate value against a stored secret
    Verify {
        /// Repository id or url
        repo: String,
        /// Secret key
        key: String,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },

    /// View the audit log of remote operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },
}

/// Secret edits shared by `add` and `edit`.
#[derive(Args, Debug, Clone, Default)]
pub struct SecretChanges {
    /// Create or update a secret (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Attach an existing secret by id (repeatable)
    #[arg(long = "attach", value_name = "SECRET_ID")]
    pub attach: Vec<i64>,

    /// Read KEY=VALUE lines from a .env-style file
    #[arg(long, value_name = "FILE")]
    pub from_file: Option<PathBuf>,
}

impl SecretChanges {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.attach.is_empty() && self.from_file.is_none()
    }
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load `.secretsync.toml` from the current directory and apply CLI
/// overrides.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let cwd = std::env::current_dir()?;
    let mut settings = Settings::load(&cwd)?;
    if let Some(server) = &cli.server {
        settings.server_url = server.clone();
    }
    Ok(settings)
}

pub fn remote_store(settings: &Settings) -> Result<HttpRemoteStore> {
    HttpRemoteStore::from_settings(settings)
}

pub fn engine(settings: &Settings) -> Result<ReconcileEngine<HttpRemoteStore>> {
    Ok(ReconcileEngine::new(remote_store(settings)?).with_max_in_flight(settings.max_in_flight()))
}

/// `true` when both stdin and stdout are attached to a terminal.
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && console::user_attended()
}
