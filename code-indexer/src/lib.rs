//! Repository indexing and context retrieval.
//!
//! The indexer materializes a working copy of a repository, walks its tree
//! and stores line-bounded snippets (with metadata and, when available,
//! embeddings) in the configured [`vector_store::VectorStore`]. The query
//! side answers, for each changed file of a pull request, a [`CodeContext`]
//! of relevant imports, symbol definitions and similar snippets which the
//! enricher prepends to the patch under review.
//!
//! Retrieval is strictly best-effort: every subquery failure degrades to an
//! empty section and a warning, never an aborted review.

pub mod config;
pub mod enrich;
pub mod errors;
pub mod extract;
pub mod git;
pub mod keywords;
pub mod walk;

mod indexer;
mod query;

pub use config::{CloneConfig, IndexerConfig};
pub use enrich::enrich_patch_with_context;
pub use errors::{IndexError, IndexResult};
pub use indexer::{IndexStats, RepoIndexer};

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use vector_store::{EmbeddingClient, VectorStore};

/// One changed file of a pull request, as the retriever sees it.
#[derive(Debug, Clone)]
pub struct ChangedFile {
    pub path: String,
    pub patch: String,
}

/// Repository coordinates for a context query.
#[derive(Debug, Clone)]
pub struct RepoInfo {
    pub owner: String,
    pub name: String,
    pub language: String,
    pub branch: String,
    /// Head commit of the PR; scopes queries to the matching index rows.
    pub head_sha: String,
}

impl RepoInfo {
    pub fn repo_key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A similar-code hit returned by the retriever.
#[derive(Debug, Clone)]
pub struct CodeSnippet {
    pub filename: String,
    pub content: String,
    pub similarity: f64,
    pub line_start: i64,
    pub line_end: i64,
}

/// Retrieved context for one changed file, consumed once by the enricher.
#[derive(Debug, Clone, Default)]
pub struct CodeContext {
    pub imports: Vec<String>,
    pub definitions: BTreeMap<String, String>,
    pub references: Vec<String>,
    pub dependencies: Vec<String>,
    pub similar: Vec<CodeSnippet>,
}

impl CodeContext {
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
            && self.definitions.is_empty()
            && self.references.is_empty()
            && self.dependencies.is_empty()
            && self.similar.is_empty()
    }
}

/// Caches one [`RepoIndexer`] per repository.
pub struct IndexManager {
    store: Arc<VectorStore>,
    embedder: EmbeddingClient,
    clone_cfg: CloneConfig,
    indexers: RwLock<HashMap<String, Arc<RepoIndexer>>>,
}

impl IndexManager {
    /// Builds the manager, its store backend and the embedding client from
    /// configuration.
    pub fn from_config(cfg: &IndexerConfig) -> IndexResult<Self> {
        let embedder = EmbeddingClient::from_config(&cfg.embedding)?;
        let store = Arc::new(VectorStore::from_config(
            &cfg.store,
            Some(embedder.clone()),
        )?);
        Ok(Self {
            store,
            embedder,
            clone_cfg: cfg.clone.clone(),
            indexers: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the indexer for a repository, creating it on first use.
    pub fn get_indexer(&self, owner: &str, repo: &str) -> Arc<RepoIndexer> {
        let repo_key = format!("{owner}/{repo}");

        {
            let cache = self.indexers.read().unwrap_or_else(|e| e.into_inner());
            if let Some(indexer) = cache.get(&repo_key) {
                return indexer.clone();
            }
        }

        let mut cache = self.indexers.write().unwrap_or_else(|e| e.into_inner());
        cache
            .entry(repo_key.clone())
            .or_insert_with(|| {
                Arc::new(RepoIndexer::new(
                    repo_key,
                    self.store.clone(),
                    self.embedder.clone(),
                    self.clone_cfg.clone(),
                ))
            })
            .clone()
    }
}
