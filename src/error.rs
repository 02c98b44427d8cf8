//! Error taxonomy
//!
//! Errors are grouped by the scope they abort:
//!
//! - [`ConfigError`]: fatal, raised before any network or filesystem activity
//! - [`BackupError`]: fatal setup failures (git missing, destination unusable)
//! - [`ListError`]: organization-scoped, the sweep moves on to the next organization
//! - [`SyncError`]: repository-scoped, the sweep moves on to the next repository

use std::path::PathBuf;
use thiserror::Error;

/// Configuration could not be loaded or validated
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing required key `{0}`")]
    MissingKey(&'static str),

    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Listing an organization's repositories failed
#[derive(Debug, Error)]
pub enum ListError {
    /// The credential was rejected
    #[error("authentication rejected for organization '{organization}': {message}")]
    Auth {
        organization: String,
        message: String,
    },

    /// The organization does not exist or is not visible with this credential
    #[error("organization '{organization}' not found or inaccessible: {message}")]
    NotFound {
        organization: String,
        message: String,
    },

    /// The API signalled throttling
    #[error("rate limited while listing '{organization}': {message}")]
    RateLimit {
        organization: String,
        message: String,
    },

    #[error("GitHub API error while listing '{organization}': {message}")]
    Api {
        organization: String,
        message: String,
    },
}

/// Synchronizing a single repository failed
#[derive(Debug, Error)]
pub enum SyncError {
    /// Local history has commits that are not upstream; nothing was changed
    #[error("local branch has diverged from upstream ({ahead} local-only, {behind} upstream-only commits)")]
    Diverged { ahead: u32, behind: u32 },

    /// The local path exists but is not a usable working copy
    #[error("local state is corrupt: {0}")]
    CorruptLocalState(String),

    /// The working tree has modified, deleted or untracked files; nothing was changed
    #[error("working tree has {files} uncommitted change(s)")]
    UncommittedChanges { files: usize },

    #[error("`{command}` exited with status {status}: {stderr}")]
    Subprocess {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Unrecoverable conditions that abort the whole run
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("git executable is not usable: {0}")]
    GitUnavailable(#[source] SyncError),

    #[error("cannot create destination directory {path:?}: {source}")]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
