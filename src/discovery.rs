//! Repository discovery abstraction layer
//!
//! The orchestrator only sees [`RepositoryLister`]; the GitHub implementation
//! lives in [`crate::github`]. Listings are produced fresh on every run and
//! nothing about them is persisted.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::ListError;

/// A repository as listed by the remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDescriptor {
    /// Owning organization (e.g., "acme")
    pub organization: String,

    /// Repository name, unique within the organization
    pub name: String,

    /// Plain HTTPS clone URL, empty when the API reported none; credentials
    /// are added only when git runs
    pub clone_url: String,

    /// Default branch name, if the API reported one
    pub default_branch: Option<String>,
}

impl RepositoryDescriptor {
    pub fn new(
        organization: impl Into<String>,
        name: impl Into<String>,
        clone_url: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            name: name.into(),
            clone_url: clone_url.into(),
            default_branch: None,
        }
    }

    /// Get display name (organization/name format)
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.organization, self.name)
    }

    /// Where this repository lives under the backup root
    pub fn local_path(&self, destination_root: &Path) -> PathBuf {
        destination_root.join(&self.organization).join(&self.name)
    }

    pub fn has_clone_url(&self) -> bool {
        !self.clone_url.trim().is_empty()
    }

    /// Whether the name can be used as a single directory component
    pub fn has_safe_name(&self) -> bool {
        is_safe_segment(&self.name)
    }
}

pub(crate) fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
        && !segment.contains('\0')
}

/// Lists the repositories of one organization.
///
/// The credential is bound when the lister is constructed. Implementations
/// return the complete set for the organization, ordered by name, and never
/// retry on their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepositoryLister: Send + Sync {
    async fn list(&self, organization: &str) -> Result<Vec<RepositoryDescriptor>, ListError>;

    /// Provider name for display/logging
    fn provider_name(&self) -> &'static str;
}

/// Order repositories by name, case-insensitively, with exact name as tie-breaker
pub fn sort_by_name(repositories: &mut [RepositoryDescriptor]) {
    repositories.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
}
