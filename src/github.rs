use anyhow::{Context, Result};
use async_trait::async_trait;
use octocrab::models::Repository;
use octocrab::Octocrab;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::discovery::{sort_by_name, RepositoryDescriptor, RepositoryLister};
use crate::error::ListError;

/// Repositories requested per API page (GitHub's maximum)
const PAGE_SIZE: u8 = 100;

/// Lists organization repositories through the GitHub REST API
pub struct GitHubLister {
    client: Octocrab,
}

impl GitHubLister {
    /// Create a lister authenticated with the configured token
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(config.github.token.clone());

        if let Some(api_url) = &config.github.api_url {
            debug!("Using GitHub API at {}", api_url);
            builder = builder
                .base_uri(api_url.as_str())
                .with_context(|| format!("Invalid github.api_url: {}", api_url))?;
        }

        let client = builder.build().context("Failed to create GitHub client")?;

        Ok(Self { client })
    }

    /// Convert an API repository into a descriptor.
    ///
    /// A repository without any usable URL keeps an empty `clone_url` so the
    /// sweep still records it as a failure.
    fn to_descriptor(organization: &str, repo: Repository) -> RepositoryDescriptor {
        let clone_url = repo.clone_url.as_ref().map(|url| url.to_string()).or_else(|| {
            repo.html_url
                .as_ref()
                .map(|url| format!("{}.git", url.as_str().trim_end_matches('/')))
        });

        if clone_url.is_none() {
            warn!(
                "API returned no clone URL for {}/{}",
                organization, repo.name
            );
        }

        RepositoryDescriptor {
            organization: organization.to_string(),
            name: repo.name,
            clone_url: clone_url.unwrap_or_default(),
            default_branch: repo.default_branch,
        }
    }
}

#[async_trait]
impl RepositoryLister for GitHubLister {
    async fn list(&self, organization: &str) -> Result<Vec<RepositoryDescriptor>, ListError> {
        debug!("Fetching repositories for organization: {}", organization);

        let mut page = self
            .client
            .orgs(organization)
            .list_repos()
            .per_page(PAGE_SIZE)
            .send()
            .await
            .map_err(|e| classify(organization, e))?;

        let mut repositories = Vec::new();
        let mut pages = 1u32;

        loop {
            let next = page.next.clone();
            repositories.extend(
                page.items
                    .into_iter()
                    .map(|repo| Self::to_descriptor(organization, repo)),
            );

            match self
                .client
                .get_page::<Repository>(&next)
                .await
                .map_err(|e| classify(organization, e))?
            {
                Some(next_page) => {
                    pages += 1;
                    page = next_page;
                }
                None => break,
            }
        }

        sort_by_name(&mut repositories);

        info!(
            "Found {} repositories for organization {} ({} pages)",
            repositories.len(),
            organization,
            pages
        );
        Ok(repositories)
    }

    fn provider_name(&self) -> &'static str {
        "GitHub"
    }
}

fn classify(organization: &str, err: octocrab::Error) -> ListError {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            classify_response(organization, source.status_code.as_u16(), &source.message)
        }
        other => ListError::Api {
            organization: organization.to_string(),
            message: other.to_string(),
        },
    }
}

/// Map an API error response onto the organization-scoped error taxonomy
fn classify_response(organization: &str, status: u16, message: &str) -> ListError {
    let organization = organization.to_string();
    let message = message.to_string();
    let rate_limited = status == 429 || message.to_lowercase().contains("rate limit");

    match status {
        401 => ListError::Auth {
            organization,
            message,
        },
        403 | 429 if rate_limited => ListError::RateLimit {
            organization,
            message,
        },
        403 | 404 => ListError::NotFound {
            organization,
            message,
        },
        _ => ListError::Api {
            organization,
            message: format!("HTTP {}: {}", status, message),
        },
    }
}
