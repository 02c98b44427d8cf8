//! Backup Orchestrator - one sequential sweep over all configured organizations
//!
//! For every organization the orchestrator lists its repositories and then
//! clones or fast-forwards each one. Failures are confined to the smallest
//! scope: a listing failure skips one organization, a sync failure skips one
//! repository. Only setup failures abort the run.
//!
//! Whether `destination_root/organization/name` exists is the only state
//! consulted; there is no manifest.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::config::{Config, ExcludePatterns};
use crate::discovery::{RepositoryDescriptor, RepositoryLister};
use crate::error::{BackupError, ConfigError, ListError};
use crate::git::{path_exists, LocalState, RepositorySyncer, SyncAction};
use crate::report::{Level, Reporter};

/// What happened to one repository during a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Cloned,
    Updated,
    Failed,
}

impl From<SyncAction> for Action {
    fn from(action: SyncAction) -> Self {
        match action {
            SyncAction::Cloned => Action::Cloned,
            SyncAction::Updated => Action::Updated,
        }
    }
}

/// Outcome of one repository, or of an organization whose listing failed
#[derive(Debug, Clone)]
pub struct OperationOutcome {
    pub organization: String,
    /// `None` for the synthetic outcome of a failed organization listing
    pub repository: Option<RepositoryDescriptor>,
    pub action: Action,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl OperationOutcome {
    pub fn success(repository: &RepositoryDescriptor, action: Action) -> Self {
        Self {
            organization: repository.organization.clone(),
            repository: Some(repository.clone()),
            action,
            detail: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(repository: &RepositoryDescriptor, detail: impl Into<String>) -> Self {
        Self {
            organization: repository.organization.clone(),
            repository: Some(repository.clone()),
            action: Action::Failed,
            detail: Some(detail.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn organization_failure(organization: &str, detail: impl Into<String>) -> Self {
        Self {
            organization: organization.to_string(),
            repository: None,
            action: Action::Failed,
            detail: Some(detail.into()),
            timestamp: Utc::now(),
        }
    }

    /// `organization/repository`, or just `organization` for listing failures
    pub fn subject(&self) -> String {
        match &self.repository {
            Some(repository) => repository.full_name(),
            None => self.organization.clone(),
        }
    }

    pub fn repository_name(&self) -> Option<&str> {
        self.repository.as_ref().map(|r| r.name.as_str())
    }
}

/// Results from a complete sweep
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub cloned: usize,
    pub updated: usize,
    pub failed: usize,
    pub duration: Duration,
    pub outcomes: Vec<OperationOutcome>,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: Vec<OperationOutcome>, duration: Duration) -> Self {
        let count = |action: Action| outcomes.iter().filter(|o| o.action == action).count();

        Self {
            cloned: count(Action::Cloned),
            updated: count(Action::Updated),
            failed: count(Action::Failed),
            duration,
            outcomes,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|o| o.action == Action::Failed)
    }
}

/// What a real run would do with one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    Clone,
    Update,
    /// The sync would fail before touching the network
    Blocked(String),
}

#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub repository: RepositoryDescriptor,
    pub local_path: PathBuf,
    pub action: PlannedAction,
}

/// Dry-run result
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub entries: Vec<PlanEntry>,
    /// Organizations whose listing failed, with the reason
    pub unreachable: Vec<(String, String)>,
}

/// Drives the lister and the syncer over every configured organization
pub struct BackupOrchestrator {
    config: Config,
    lister: Box<dyn RepositoryLister>,
    syncer: RepositorySyncer,
    reporter: Reporter,
    excludes: ExcludePatterns,
}

impl BackupOrchestrator {
    pub fn new(
        config: Config,
        lister: Box<dyn RepositoryLister>,
        reporter: Reporter,
    ) -> Result<Self, ConfigError> {
        let excludes = config.exclude_patterns()?;
        let syncer = RepositorySyncer::new(&config);

        Ok(Self {
            config,
            lister,
            syncer,
            reporter,
            excludes,
        })
    }

    /// Run one sweep and return every outcome in order plus the counts
    pub async fn run(&mut self) -> Result<RunSummary, BackupError> {
        let start_time = Instant::now();
        let root = self.prepare().await?;

        info!(
            "Backing up {} organizations from {} into {}",
            self.config.github.organizations.len(),
            self.lister.provider_name(),
            root.display()
        );

        let mut outcomes = Vec::new();
        let organizations = self.config.github.organizations.clone();
        for organization in &organizations {
            self.sweep_organization(organization, &root, &mut outcomes)
                .await;
        }

        let summary = RunSummary::from_outcomes(outcomes, start_time.elapsed());
        self.reporter.summary(&summary);

        info!(
            "Backup completed in {:.2}s: {} cloned, {} updated, {} failed",
            summary.duration.as_secs_f64(),
            summary.cloned,
            summary.updated,
            summary.failed
        );

        Ok(summary)
    }

    /// Preview the sweep without creating, fetching or modifying anything locally
    pub async fn plan(&self) -> Plan {
        let root = self.config.destination_root();
        let mut plan = Plan::default();

        for organization in &self.config.github.organizations {
            let repositories = match self.list_organization(organization).await {
                Ok(repositories) => repositories,
                Err(e) => {
                    plan.unreachable.push((organization.clone(), e.to_string()));
                    continue;
                }
            };

            for repository in repositories {
                let local_path = repository.local_path(&root);
                let action = if !repository.has_safe_name() {
                    PlannedAction::Blocked("unsafe repository name".to_string())
                } else if !repository.has_clone_url() {
                    PlannedAction::Blocked("no clone URL".to_string())
                } else {
                    match self.syncer.inspect(&local_path).await {
                        LocalState::Absent => PlannedAction::Clone,
                        LocalState::WorkingCopy => PlannedAction::Update,
                        LocalState::Invalid(reason) => PlannedAction::Blocked(reason),
                    }
                };

                plan.entries.push(PlanEntry {
                    repository,
                    local_path,
                    action,
                });
            }
        }

        plan
    }

    /// Fatal preconditions: git must run and the destination must exist
    async fn prepare(&mut self) -> Result<PathBuf, BackupError> {
        let version = self
            .syncer
            .check_available()
            .await
            .map_err(BackupError::GitUnavailable)?;
        debug!("Using {}", version);

        let root = self.config.destination_root();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| BackupError::Destination {
                path: root.clone(),
                source,
            })?;

        Ok(root)
    }

    async fn sweep_organization(
        &mut self,
        organization: &str,
        root: &Path,
        outcomes: &mut Vec<OperationOutcome>,
    ) {
        self.reporter
            .note(Level::Info, organization, "listing repositories");

        let repositories = match self.list_organization(organization).await {
            Ok(repositories) => repositories,
            Err(e) => {
                error!("Skipping organization {}: {}", organization, e);
                let outcome = OperationOutcome::organization_failure(organization, e.to_string());
                self.reporter.record(&outcome);
                outcomes.push(outcome);
                return;
            }
        };

        self.reporter.note(
            Level::Info,
            organization,
            &format!("{} repositories to back up", repositories.len()),
        );

        for repository in &repositories {
            let outcome = self.backup_repository(root, repository).await;
            self.reporter.record(&outcome);
            outcomes.push(outcome);
        }
    }

    /// List one organization and drop excluded repositories
    async fn list_organization(
        &self,
        organization: &str,
    ) -> Result<Vec<RepositoryDescriptor>, ListError> {
        let repositories = self.lister.list(organization).await?;
        let listed = repositories.len();

        let kept: Vec<_> = repositories
            .into_iter()
            .filter(|repo| {
                let excluded = self.excludes.matches(&repo.name);
                if excluded {
                    debug!("Excluding repository due to pattern match: {}", repo.full_name());
                }
                !excluded
            })
            .collect();

        debug!(
            "Organization {}: {} listed, {} after exclusions",
            organization,
            listed,
            kept.len()
        );
        Ok(kept)
    }

    async fn backup_repository(
        &mut self,
        root: &Path,
        repository: &RepositoryDescriptor,
    ) -> OperationOutcome {
        if !repository.has_safe_name() {
            return OperationOutcome::failure(
                repository,
                format!("refusing unsafe repository name {:?}", repository.name),
            );
        }

        if !repository.has_clone_url() {
            return OperationOutcome::failure(repository, "API returned no clone URL");
        }

        let local_path = repository.local_path(root);
        let what = if path_exists(&local_path) {
            "updating"
        } else {
            "cloning"
        };
        self.reporter.started(repository, what);

        match self.syncer.sync(&local_path, &repository.clone_url).await {
            Ok(action) => OperationOutcome::success(repository, action.into()),
            Err(e) => {
                error!("Failed to back up {}: {}", repository.full_name(), e);
                OperationOutcome::failure(repository, e.to_string())
            }
        }
    }
}
