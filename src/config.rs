use crate::error::{DigestError, Result};
use crate::model::{Project, User};
use crate::orchestrator::MISC_PROJECT_ID;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const ANTHROPIC_TOKEN_ENV: &str = "ANTHROPIC_AUTH_TOKEN";
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const JIRA_TOKEN_ENV: &str = "JIRA_API_TOKEN";
pub const LINEAR_KEY_ENV: &str = "LINEAR_API_KEY";
pub const PAGERDUTY_TOKEN_ENV: &str = "PAGERDUTY_TOKEN";
pub const SLACK_WEBHOOK_ENV: &str = "SLACK_WEBHOOK_URL";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Name shown in the summary header
    #[serde(default = "default_summary_name")]
    pub summary_name: String,

    /// Default reporting window in days (default: 7)
    #[serde(default = "default_timespan")]
    pub default_timespan_days: u32,

    /// Collect untracked work of misc users into an extra project
    #[serde(default = "default_true")]
    pub include_misc: bool,

    /// Claude API key (ANTHROPIC_AUTH_TOKEN takes precedence)
    #[serde(default)]
    pub claude_api_key: Option<String>,

    /// Claude model override
    #[serde(default)]
    pub claude_model: Option<String>,

    /// Upper bound on rollup length in tokens
    #[serde(default)]
    pub claude_max_tokens: Option<u32>,

    /// Enable caching of generated rollups
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Cache TTL in hours (default: 24)
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_hours: u32,

    /// GitHub token (GITHUB_TOKEN takes precedence)
    #[serde(default)]
    pub github_token: Option<String>,

    /// GitHub organizations searched for merged PRs
    #[serde(default)]
    pub github_orgs: Vec<String>,

    /// Slack incoming webhook used by `--publish`
    #[serde(default)]
    pub slack_webhook_url: Option<String>,

    /// Jira or Linear
    pub project_management: ProjectManagementConfig,

    /// PagerDuty incidents; omitted means the integration is disabled
    #[serde(default)]
    pub pagerduty: Option<PagerDutyConfig>,

    #[serde(default)]
    pub users: Vec<User>,

    #[serde(default)]
    pub projects: Vec<Project>,
}

/// Project-management backend, selected by the `backend` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum ProjectManagementConfig {
    Jira {
        /// e.g. https://acme.atlassian.net
        base_url: String,
        email: String,
        #[serde(default)]
        api_token: Option<String>,
    },
    Linear {
        #[serde(default)]
        api_key: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagerDutyConfig {
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub service_ids: Vec<String>,
}

impl Config {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DigestError::config(format!(
                "Config file not found at: {}",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DigestError::config("Could not determine home directory"))?;
        Ok(home.join(".config").join("eng-digest").join("config.toml"))
    }

    /// Get the default cache directory path
    pub fn default_cache_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DigestError::config("Could not determine home directory"))?;
        Ok(home.join(".cache").join("eng-digest"))
    }

    /// Write a default configuration file to `path`
    pub fn create_default_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config = Self::default();
        let toml_string = toml::to_string_pretty(&config)?;
        fs::write(path, toml_string)?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.default_timespan_days == 0 {
            return Err(DigestError::config("default_timespan_days must be > 0"));
        }

        if self.cache_ttl_hours == 0 {
            return Err(DigestError::config("cache_ttl_hours must be > 0"));
        }

        if let ProjectManagementConfig::Jira { ref base_url, .. } = self.project_management {
            if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
                return Err(DigestError::config(
                    "project_management.base_url must be an http(s) URL",
                ));
            }
        }

        let mut ids = HashSet::new();
        for project in &self.projects {
            if project.id == MISC_PROJECT_ID {
                return Err(DigestError::config(format!(
                    "project id {} is reserved for the Misc project",
                    MISC_PROJECT_ID
                )));
            }
            if !ids.insert(project.id) {
                return Err(DigestError::config(format!(
                    "duplicate project id {}",
                    project.id
                )));
            }
        }

        if let Some(user) = self.users.iter().find(|u| u.name.trim().is_empty()) {
            return Err(DigestError::config(format!("user {} has no name", user.id)));
        }

        Ok(())
    }

    /// Users whose untracked work goes into the Misc project
    pub fn misc_users(&self) -> Vec<User> {
        self.users.iter().filter(|u| u.misc).cloned().collect()
    }

    /// Claude API key from the environment or the config file
    pub fn claude_api_key(&self) -> Result<String> {
        resolve_secret(env_secret(ANTHROPIC_TOKEN_ENV), self.claude_api_key.as_ref())
            .ok_or_else(|| {
                DigestError::MissingConfig(format!(
                    "claude_api_key (or {}) is required",
                    ANTHROPIC_TOKEN_ENV
                ))
            })
    }

    pub fn github_token(&self) -> Option<String> {
        resolve_secret(env_secret(GITHUB_TOKEN_ENV), self.github_token.as_ref())
    }

    pub fn slack_webhook_url(&self) -> Option<String> {
        resolve_secret(env_secret(SLACK_WEBHOOK_ENV), self.slack_webhook_url.as_ref())
    }

    /// Token for the configured project-management backend
    pub fn project_management_token(&self) -> Result<String> {
        let (env_name, configured) = match self.project_management {
            ProjectManagementConfig::Jira { ref api_token, .. } => (JIRA_TOKEN_ENV, api_token),
            ProjectManagementConfig::Linear { ref api_key } => (LINEAR_KEY_ENV, api_key),
        };
        resolve_secret(env_secret(env_name), configured.as_ref()).ok_or_else(|| {
            DigestError::MissingConfig(format!(
                "project-management token (or {}) is required",
                env_name
            ))
        })
    }

    /// PagerDuty token and service ids, when the integration is usable
    pub fn pagerduty_settings(&self) -> Option<(String, Vec<String>)> {
        let pagerduty = self.pagerduty.as_ref()?;
        let token = resolve_secret(env_secret(PAGERDUTY_TOKEN_ENV), pagerduty.api_token.as_ref())?;
        Some((token, pagerduty.service_ids.clone()))
    }
}

fn env_secret(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Environment value wins over the configured one; blanks count as unset
fn resolve_secret(from_env: Option<String>, configured: Option<&String>) -> Option<String> {
    from_env
        .filter(|value| !value.trim().is_empty())
        .or_else(|| configured.filter(|value| !value.trim().is_empty()).cloned())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            summary_name: default_summary_name(),
            default_timespan_days: default_timespan(),
            include_misc: default_true(),
            claude_api_key: None,
            claude_model: None,
            claude_max_tokens: None,
            cache_enabled: default_true(),
            cache_ttl_hours: default_cache_ttl(),
            github_token: None,
            github_orgs: Vec::new(),
            slack_webhook_url: None,
            project_management: ProjectManagementConfig::Jira {
                base_url: "https://your-site.atlassian.net".to_string(),
                email: "you@example.com".to_string(),
                api_token: None,
            },
            pagerduty: None,
            users: Vec::new(),
            projects: Vec::new(),
        }
    }
}

// Serde default functions
fn default_summary_name() -> String {
    "Weekly Engineering Summary".to_string()
}

fn default_timespan() -> u32 {
    7
}

fn default_cache_ttl() -> u32 {
    24
}

fn default_true() -> bool {
    true
}
