//! orgmirror - GitHub organization backup
//!
//! orgmirror mirrors every repository of one or more GitHub organizations into
//! `destination/<organization>/<repository>`, cloning new repositories and
//! fast-forwarding existing ones. It is meant to run from cron.
//!
//! ## Modules
//!
//! - [`config`]: YAML configuration loading and validation
//! - [`discovery`]: repository descriptors and the lister abstraction
//! - [`github`]: GitHub API lister
//! - [`git`]: clone-or-fast-forward of a single repository
//! - [`backup`]: the sequential sweep over all organizations
//! - [`report`]: operation log and console reporting
//! - [`error`]: error taxonomy

pub mod backup;
pub mod config;
pub mod discovery;
pub mod error;
pub mod git;
pub mod github;
pub mod report;

pub use backup::{Action, BackupOrchestrator, OperationOutcome, Plan, PlannedAction, RunSummary};
pub use config::Config;
pub use discovery::{RepositoryDescriptor, RepositoryLister};
pub use error::{BackupError, ConfigError, ListError, SyncError};
pub use git::{LocalState, RepositorySyncer, SyncAction};
pub use github::GitHubLister;
pub use report::Reporter;
