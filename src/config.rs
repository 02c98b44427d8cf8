use dirs::config_dir;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::discovery::is_safe_segment;
use crate::error::ConfigError;

/// File name looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Main configuration structure, loaded once per run
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// GitHub credential and organizations to mirror
    #[serde(default)]
    pub github: GitHubConfig,

    /// Where and how backups are written
    #[serde(default)]
    pub backup: BackupConfig,
}

/// GitHub configuration
#[derive(Deserialize, Serialize, Clone, Default)]
pub struct GitHubConfig {
    /// Personal access token used for the API and for HTTPS clones
    #[serde(default)]
    pub token: String,

    /// Organizations to mirror, in processing order
    #[serde(default)]
    pub organizations: Vec<String>,

    /// API root for GitHub Enterprise (defaults to api.github.com)
    #[serde(default)]
    pub api_url: Option<String>,

    /// Repository exclusion patterns (`*` and `?` globs on the repository name)
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Backup destination configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackupConfig {
    /// Root of the mirror tree; repositories land in `<root>/<org>/<repo>`
    #[serde(default)]
    pub destination_path: String,

    /// Append-only operation log
    #[serde(default)]
    pub log_file: String,

    /// Timeout for each git subprocess in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    600
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            destination_path: String::new(),
            log_file: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

// The token must never reach logs through `{:?}`
impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("GitHubConfig")
            .field("token", &token)
            .field("organizations", &self.organizations)
            .field("api_url", &self.api_url)
            .field("exclude_patterns", &self.exclude_patterns)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from a specific file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: PathBuf::new(),
                source,
            })?;

        config.validate()?;
        config.expand_paths()?;

        Ok(config)
    }

    /// Resolve which configuration file to use when none was given explicitly
    pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
        if let Some(path) = explicit {
            return path;
        }

        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return local;
        }

        Self::default_config_path().unwrap_or(local)
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("orgmirror").join(DEFAULT_CONFIG_FILE))
    }

    /// Check required keys and normalize the organization list
    fn validate(&mut self) -> Result<(), ConfigError> {
        if self.github.token.trim().is_empty() {
            return Err(ConfigError::MissingKey("github.token"));
        }
        self.github.token = self.github.token.trim().to_string();

        if self.github.organizations.is_empty() {
            return Err(ConfigError::MissingKey("github.organizations"));
        }
        if self.github.organizations.iter().any(|org| org.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                key: "github.organizations",
                reason: "organization names must not be blank".to_string(),
            });
        }
        self.github.organizations = dedup_organizations(&self.github.organizations);
        if let Some(org) = self
            .github
            .organizations
            .iter()
            .find(|org| !is_safe_segment(org))
        {
            return Err(ConfigError::Invalid {
                key: "github.organizations",
                reason: format!("{:?} cannot be used as a directory name", org),
            });
        }

        if self.backup.destination_path.trim().is_empty() {
            return Err(ConfigError::MissingKey("backup.destination_path"));
        }
        if self.backup.log_file.trim().is_empty() {
            return Err(ConfigError::MissingKey("backup.log_file"));
        }
        if self.backup.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "backup.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        ExcludePatterns::compile(&self.github.exclude_patterns)?;

        Ok(())
    }

    /// Expand environment variables and `~` in configuration paths
    pub fn expand_paths(&mut self) -> Result<(), ConfigError> {
        self.backup.destination_path =
            expand_path("backup.destination_path", &self.backup.destination_path)?;
        self.backup.log_file = expand_path("backup.log_file", &self.backup.log_file)?;
        Ok(())
    }

    pub fn destination_root(&self) -> PathBuf {
        PathBuf::from(&self.backup.destination_path)
    }

    pub fn log_path(&self) -> PathBuf {
        PathBuf::from(&self.backup.log_file)
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.backup.timeout_secs)
    }

    /// Compiled exclusion matcher for the configured patterns
    pub fn exclude_patterns(&self) -> Result<ExcludePatterns, ConfigError> {
        ExcludePatterns::compile(&self.github.exclude_patterns)
    }
}

fn expand_path(key: &'static str, raw: &str) -> Result<String, ConfigError> {
    let expanded = shellexpand::full(raw.trim()).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })?;
    Ok(path_clean::clean(&*expanded)
        .to_string_lossy()
        .into_owned())
}

/// Drop duplicate organizations, keeping the first occurrence of each
pub fn dedup_organizations(organizations: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    organizations
        .iter()
        .map(|org| org.trim().to_string())
        .filter(|org| seen.insert(org.clone()))
        .collect()
}

/// Glob patterns matched against repository names
#[derive(Debug, Clone, Default)]
pub struct ExcludePatterns {
    patterns: Vec<Regex>,
}

impl ExcludePatterns {
    pub fn compile(globs: &[String]) -> Result<Self, ConfigError> {
        let patterns = globs
            .iter()
            .map(|glob| {
                let body = regex::escape(glob)
                    .replace(r"\*", ".*")
                    .replace(r"\?", ".");
                Regex::new(&format!("^{}$", body)).map_err(|e| ConfigError::Invalid {
                    key: "github.exclude_patterns",
                    reason: format!("{}: {}", glob, e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(name))
    }
}
