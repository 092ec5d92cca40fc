//! Application configuration and shared handler state.

use std::{env, fmt, sync::Arc};

use ai_llm_service::ProviderChain;
use code_indexer::IndexManager;
use pr_reviewer::git_providers::{ProviderConfig, ProviderKind};
use pr_reviewer::review::filter::FilterConfig;
use pr_reviewer::review::prompt::{Language, PromptConfig, DEFAULT_PROMPT};
use pr_reviewer::ReviewConfig;

/// Application configuration loaded once from environment variables.
#[derive(Clone)]
pub struct AppConfig {
    /// Active platform; exactly one adapter per process.
    pub platform: ProviderKind,
    pub github_token: String,
    pub github_base_url: String,
    pub gitlab_token: String,
    pub gitlab_base_url: String,
    pub gitea_token: String,
    pub gitea_base_url: String,
    /// Shared webhook secret; empty disables signature verification.
    pub webhook_secret: String,
    pub target_label: String,
    pub language: String,
    pub base_prompt: String,
    pub max_patch_length: usize,
    pub include_patterns: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub ignore_list: Vec<String>,
    pub enable_indexing: bool,
    /// Listen address, e.g. "0.0.0.0:8080".
    pub address: String,
}

/// Errors that may occur while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Required variable is missing or empty.
    MissingVar { name: &'static str },
    /// Variable is present but contains an invalid value.
    InvalidValue { name: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVar { name } => {
                write!(f, "missing required environment variable: {name}")
            }
            ConfigError::InvalidValue { name, reason } => {
                write!(f, "invalid value for {name}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    /// Loads configuration from environment variables, validating that the
    /// selected platform has its credentials.
    pub fn from_env() -> Result<Self, ConfigError> {
        let platform = match env_or("PLATFORM", "github").to_lowercase().as_str() {
            "github" => ProviderKind::GitHub,
            "gitlab" => ProviderKind::GitLab,
            "gitea" => ProviderKind::Gitea,
            other => {
                return Err(ConfigError::InvalidValue {
                    name: "PLATFORM",
                    reason: format!("unsupported platform: {other}"),
                })
            }
        };

        let cfg = Self {
            platform,
            github_token: env::var("GITHUB_TOKEN").unwrap_or_default(),
            github_base_url: env_or("GITHUB_BASE_URL", "https://api.github.com"),
            gitlab_token: env::var("GITLAB_TOKEN").unwrap_or_default(),
            gitlab_base_url: env_or("GITLAB_BASE_URL", "https://gitlab.com/api/v4"),
            gitea_token: env::var("GITEA_TOKEN").unwrap_or_default(),
            gitea_base_url: env::var("GITEA_BASE_URL").unwrap_or_default(),
            webhook_secret: env::var("WEBHOOK_SECRET").unwrap_or_default(),
            target_label: env::var("TARGET_LABEL").unwrap_or_default(),
            language: env::var("LANGUAGE").unwrap_or_default(),
            base_prompt: env_or("PROMPT", DEFAULT_PROMPT),
            max_patch_length: env::var("MAX_PATCH_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            include_patterns: split_and_trim(&env::var("INCLUDE_PATTERNS").unwrap_or_default(), ','),
            ignore_patterns: split_and_trim(&env::var("IGNORE_PATTERNS").unwrap_or_default(), ','),
            ignore_list: split_and_trim(&env::var("IGNORE").unwrap_or_default(), '\n'),
            enable_indexing: env::var("ENABLE_INDEXING").unwrap_or_default() == "true",
            address: env_or("API_ADDRESS", "0.0.0.0:8080"),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.platform {
            ProviderKind::GitHub if self.github_token.trim().is_empty() => {
                Err(ConfigError::MissingVar {
                    name: "GITHUB_TOKEN",
                })
            }
            ProviderKind::GitLab if self.gitlab_token.trim().is_empty() => {
                Err(ConfigError::MissingVar {
                    name: "GITLAB_TOKEN",
                })
            }
            ProviderKind::Gitea if self.gitea_token.trim().is_empty() => {
                Err(ConfigError::MissingVar { name: "GITEA_TOKEN" })
            }
            ProviderKind::Gitea if self.gitea_base_url.trim().is_empty() => {
                Err(ConfigError::MissingVar {
                    name: "GITEA_BASE_URL",
                })
            }
            _ => Ok(()),
        }
    }

    /// Adapter configuration for the active platform.
    pub fn provider_config(&self) -> ProviderConfig {
        let (base_api, token) = match self.platform {
            ProviderKind::GitHub => (self.github_base_url.clone(), self.github_token.clone()),
            ProviderKind::GitLab => (self.gitlab_base_url.clone(), self.gitlab_token.clone()),
            ProviderKind::Gitea => (self.gitea_base_url.clone(), self.gitea_token.clone()),
        };
        ProviderConfig {
            kind: self.platform,
            base_api,
            token,
        }
    }

    /// Pipeline configuration; the chunk budget comes from the LLM config.
    pub fn review_config(&self, max_chunk_tokens: usize) -> ReviewConfig {
        ReviewConfig {
            prompt: PromptConfig {
                base_prompt: self.base_prompt.clone(),
                language: Language::from_config(&self.language),
            },
            target_label: if self.target_label.trim().is_empty() {
                None
            } else {
                Some(self.target_label.clone())
            },
            filter: FilterConfig {
                include_patterns: self.include_patterns.clone(),
                ignore_patterns: self.ignore_patterns.clone(),
                ignore_list: self.ignore_list.clone(),
                max_patch_length: self.max_patch_length,
            },
            max_chunk_tokens,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("platform", &self.platform)
            .field("gitlab_base_url", &self.gitlab_base_url)
            .field("gitea_base_url", &self.gitea_base_url)
            .field("target_label", &self.target_label)
            .field("language", &self.language)
            .field("max_patch_length", &self.max_patch_length)
            .field("enable_indexing", &self.enable_indexing)
            .field("address", &self.address)
            .field("github_token", &"***")
            .field("gitlab_token", &"***")
            .field("gitea_token", &"***")
            .field("webhook_secret", &"***")
            .finish()
    }
}

/// Shared application state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Immutable configuration.
    pub config: Arc<AppConfig>,
    /// LLM provider failover chain.
    pub chain: Arc<ProviderChain>,
    /// Index manager; `None` when indexing is disabled.
    pub index: Option<Arc<IndexManager>>,
    /// Token budget per review chunk, derived from the LLM config.
    pub max_chunk_tokens: usize,
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

fn split_and_trim(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_and_trim_drops_blank_entries() {
        assert_eq!(
            split_and_trim(" a.rs , ,b.rs,", ','),
            vec!["a.rs".to_string(), "b.rs".to_string()]
        );
        assert!(split_and_trim("", ',').is_empty());
    }
}
