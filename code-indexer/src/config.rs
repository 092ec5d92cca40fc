//! Indexer configuration: storage backend, embedding source and the
//! credentials needed to materialize working copies.

use std::{env, fmt};

use vector_store::{EmbeddingConfig, StoreConfig};

use crate::errors::IndexResult;

/// Platform credentials used when cloning repositories for indexing.
#[derive(Clone, Default)]
pub struct CloneConfig {
    pub platform: String,
    pub github_token: String,
    pub gitlab_token: String,
    pub gitea_token: String,
    pub gitea_base_url: String,
}

impl CloneConfig {
    pub fn from_env() -> Self {
        Self {
            platform: env::var("PLATFORM").unwrap_or_else(|_| "github".into()),
            github_token: env::var("GITHUB_TOKEN").unwrap_or_default(),
            gitlab_token: env::var("GITLAB_TOKEN").unwrap_or_default(),
            gitea_token: env::var("GITEA_TOKEN").unwrap_or_default(),
            gitea_base_url: env::var("GITEA_BASE_URL").unwrap_or_default(),
        }
    }
}

impl fmt::Debug for CloneConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloneConfig")
            .field("platform", &self.platform)
            .field("gitea_base_url", &self.gitea_base_url)
            .field("github_token", &"***")
            .field("gitlab_token", &"***")
            .field("gitea_token", &"***")
            .finish()
    }
}

/// Full indexer configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
    pub clone: CloneConfig,
}

impl IndexerConfig {
    pub fn from_env() -> IndexResult<Self> {
        Ok(Self {
            store: StoreConfig::from_env()?,
            embedding: EmbeddingConfig::from_env()?,
            clone: CloneConfig::from_env(),
        })
    }
}
