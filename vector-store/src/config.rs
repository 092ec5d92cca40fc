//! Runtime configuration for snippet storage and embedding services.

use std::{env, fmt, path::PathBuf};

use crate::errors::{StoreError, StoreResult};

/// Default embedding dimension for collections written by mixed models.
pub const DEFAULT_EMBEDDING_DIM: usize = 3072;

/// Selects the storage backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    /// Remote Chroma vector database (HTTP v2 API).
    Chroma,
    /// Local filesystem backend.
    Local,
}

/// Storage backend configuration, loaded once at startup.
#[derive(Clone)]
pub struct StoreConfig {
    pub kind: StorageKind,
    pub chroma_host: String,
    pub chroma_port: u16,
    /// Optional extra path prefix in front of `/api/v2`.
    pub chroma_path: String,
    pub chroma_ssl: bool,
    pub chroma_tenant: String,
    pub chroma_database: String,
    pub local_storage_path: PathBuf,
    /// Vector dimension expected by the collections.
    pub embedding_dim: usize,
}

impl StoreConfig {
    /// Loads storage settings from the environment.
    ///
    /// `INDEXER_CHROMA_*` variables take precedence over the plain
    /// `CHROMA_*` aliases.
    pub fn from_env() -> StoreResult<Self> {
        let kind = match env_or("INDEXER_STORAGE_TYPE", "local").to_lowercase().as_str() {
            "chroma" => StorageKind::Chroma,
            "local" => StorageKind::Local,
            other => {
                return Err(StoreError::Config(format!(
                    "unknown INDEXER_STORAGE_TYPE: {other}"
                )))
            }
        };

        let cfg = Self {
            kind,
            chroma_host: aliased("INDEXER_CHROMA_HOST", "CHROMA_HOST", "localhost"),
            chroma_port: aliased("INDEXER_CHROMA_PORT", "CHROMA_PORT", "8000")
                .parse()
                .map_err(|_| StoreError::Config("invalid chroma port".into()))?,
            chroma_path: aliased("INDEXER_CHROMA_PATH", "CHROMA_PATH", ""),
            chroma_ssl: aliased("INDEXER_CHROMA_SSL", "CHROMA_SSL", "false") == "true",
            chroma_tenant: aliased("INDEXER_CHROMA_TENANT", "CHROMA_TENANT", "default"),
            chroma_database: aliased("INDEXER_CHROMA_DATABASE", "CHROMA_DATABASE", "default"),
            local_storage_path: PathBuf::from(env_or(
                "INDEXER_LOCAL_STORAGE_PATH",
                "./data/index",
            )),
            embedding_dim: env_or("INDEXER_EMBEDDING_DIM", "3072")
                .parse()
                .unwrap_or(DEFAULT_EMBEDDING_DIM),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates configuration values for the selected backend.
    pub fn validate(&self) -> StoreResult<()> {
        match self.kind {
            StorageKind::Chroma => {
                if self.chroma_host.trim().is_empty() {
                    return Err(StoreError::Config("chroma host is empty".into()));
                }
                if self.embedding_dim == 0 {
                    return Err(StoreError::Config("embedding dimension must be > 0".into()));
                }
            }
            StorageKind::Local => {
                if self.local_storage_path.as_os_str().is_empty() {
                    return Err(StoreError::Config("local storage path is empty".into()));
                }
            }
        }
        Ok(())
    }

    /// Base URL of the Chroma v2 API.
    pub fn chroma_base_url(&self) -> String {
        let scheme = if self.chroma_ssl { "https" } else { "http" };
        let path = self.chroma_path.trim_matches('/');
        if path.is_empty() {
            format!("{scheme}://{}:{}/api/v2", self.chroma_host, self.chroma_port)
        } else {
            format!(
                "{scheme}://{}:{}/{path}/api/v2",
                self.chroma_host, self.chroma_port
            )
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("kind", &self.kind)
            .field("chroma_host", &self.chroma_host)
            .field("chroma_port", &self.chroma_port)
            .field("chroma_tenant", &self.chroma_tenant)
            .field("chroma_database", &self.chroma_database)
            .field("local_storage_path", &self.local_storage_path)
            .field("embedding_dim", &self.embedding_dim)
            .finish()
    }
}

/// Selects the embedding source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VectorKind {
    /// OpenAI embeddings endpoint.
    OpenAi,
    /// OpenAI-compatible LLM proxy.
    LlmProxy,
    /// Deterministic hashed bag-of-words, for development only.
    Simple,
}

/// Embedding service configuration.
#[derive(Clone)]
pub struct EmbeddingConfig {
    pub kind: VectorKind,
    pub openai_api_key: String,
    pub openai_endpoint: String,
    pub openai_model: String,
    pub proxy_endpoint: String,
    pub proxy_api_key: String,
    pub proxy_model: String,
    pub proxy_provider: String,
}

impl EmbeddingConfig {
    /// Loads embedding settings from the environment.
    ///
    /// `local` is accepted as an alias for the `simple` development mode.
    pub fn from_env() -> StoreResult<Self> {
        let kind = match env_or("INDEXER_VECTOR_TYPE", "simple").to_lowercase().as_str() {
            "openai" => VectorKind::OpenAi,
            "llm_proxy" => VectorKind::LlmProxy,
            "simple" | "local" => VectorKind::Simple,
            other => {
                return Err(StoreError::Config(format!(
                    "unknown INDEXER_VECTOR_TYPE: {other}"
                )))
            }
        };

        let cfg = Self {
            kind,
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_endpoint: env_or("OPENAI_API_ENDPOINT", "https://api.openai.com/v1"),
            openai_model: env_or("INDEXER_OPENAI_EMBEDDING_MODEL", "text-embedding-3-small"),
            proxy_endpoint: env_or(
                "INDEXER_LLM_PROXY_ENDPOINT",
                &env::var("LLM_PROXY_ENDPOINT").unwrap_or_default(),
            ),
            proxy_api_key: env_or(
                "INDEXER_LLM_PROXY_API_KEY",
                &env::var("LLM_PROXY_API_KEY").unwrap_or_default(),
            ),
            proxy_model: env_or("INDEXER_LLM_PROXY_MODEL", "text-embedding-3-large"),
            proxy_provider: env::var("INDEXER_LLM_PROXY_PROVIDER").unwrap_or_default(),
        };

        match cfg.kind {
            VectorKind::OpenAi if cfg.openai_api_key.trim().is_empty() => Err(StoreError::Config(
                "OPENAI_API_KEY is required for openai embeddings".into(),
            )),
            VectorKind::LlmProxy
                if cfg.proxy_endpoint.trim().is_empty() || cfg.proxy_api_key.trim().is_empty() =>
            {
                Err(StoreError::Config(
                    "INDEXER_LLM_PROXY_ENDPOINT and INDEXER_LLM_PROXY_API_KEY are required".into(),
                ))
            }
            _ => Ok(cfg),
        }
    }
}

impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("kind", &self.kind)
            .field("openai_endpoint", &self.openai_endpoint)
            .field("openai_model", &self.openai_model)
            .field("proxy_endpoint", &self.proxy_endpoint)
            .field("proxy_model", &self.proxy_model)
            .field("proxy_provider", &self.proxy_provider)
            .field("openai_api_key", &"***")
            .field("proxy_api_key", &"***")
            .finish()
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

fn aliased(primary: &str, alias: &str, default: &str) -> String {
    match env::var(primary) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => env_or(alias, default),
    }
}
