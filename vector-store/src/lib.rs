//! Collection-scoped snippet storage behind one contract, two backends.
//!
//! The store keeps indexed code snippets (content + metadata, optionally an
//! embedding) partitioned per repository. Two backends are exposed through
//! the enum-dispatched [`VectorStore`]:
//!
//! - [`ChromaStore`]: a remote Chroma vector database over its v2 HTTP API,
//!   with filtered text and embedding queries;
//! - [`LocalStore`]: a filesystem layout for setups without a vector
//!   database, answering text queries by keyword overlap.
//!
//! No async-trait and no boxed trait objects; concrete clients are wrapped
//! in an enum and dispatched by `match`.

pub mod config;
pub mod embeddings;
pub mod errors;

mod chroma;
mod local;

pub use chroma::ChromaStore;
pub use config::{EmbeddingConfig, StorageKind, StoreConfig, VectorKind};
pub use embeddings::EmbeddingClient;
pub use errors::{StoreError, StoreResult};
pub use local::LocalStore;

use serde_json::Value;

/// Snippet metadata as stored alongside the content.
pub type Metadata = serde_json::Map<String, Value>;

/// One group of query results, parallel arrays ordered by ascending distance.
#[derive(Debug, Clone, Default)]
pub struct QueryHits {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<Metadata>,
    pub distances: Vec<f32>,
}

/// Concrete snippet store (enum-dispatch).
#[derive(Debug)]
pub enum VectorStore {
    Chroma(ChromaStore),
    Local(LocalStore),
}

impl VectorStore {
    /// Constructs the backend selected by the configuration.
    ///
    /// The embedder is used by the Chroma backend to attach vectors at save
    /// time; saving degrades to a plain document write when it fails.
    pub fn from_config(
        cfg: &StoreConfig,
        embedder: Option<EmbeddingClient>,
    ) -> StoreResult<Self> {
        Ok(match cfg.kind {
            StorageKind::Chroma => Self::Chroma(ChromaStore::new(cfg, embedder)?),
            StorageKind::Local => Self::Local(LocalStore::new(&cfg.local_storage_path)?),
        })
    }

    /// Stores one snippet and returns its id.
    pub async fn save_snippet(
        &self,
        repo_key: &str,
        path: &str,
        content: &str,
        metadata: Metadata,
    ) -> StoreResult<String> {
        match self {
            Self::Chroma(s) => s.save_snippet(repo_key, path, content, metadata).await,
            Self::Local(s) => s.save_snippet(repo_key, path, content, metadata),
        }
    }

    /// Fetches a snippet's content and metadata by id.
    pub async fn get_snippet(&self, id: &str) -> StoreResult<(String, Metadata)> {
        match self {
            Self::Chroma(s) => s.get_snippet(id).await,
            Self::Local(s) => s.get_snippet(id),
        }
    }

    /// Deletes a snippet by id. Deleting a missing snippet is not an error.
    pub async fn delete_snippet(&self, id: &str) -> StoreResult<()> {
        match self {
            Self::Chroma(s) => s.delete_snippet(id).await,
            Self::Local(s) => s.delete_snippet(id),
        }
    }

    /// Lists snippet ids recorded for one file of a repository.
    pub async fn list_by_file(&self, repo_key: &str, path: &str) -> StoreResult<Vec<String>> {
        match self {
            Self::Chroma(s) => s.list_by_file(repo_key, path).await,
            Self::Local(s) => s.list_by_file(repo_key, path),
        }
    }

    /// Lists all snippet ids of a repository.
    pub async fn list_by_repo(&self, repo_key: &str) -> StoreResult<Vec<String>> {
        match self {
            Self::Chroma(s) => s.list_by_repo(repo_key).await,
            Self::Local(s) => s.list_by_repo(repo_key),
        }
    }

    /// Text query over the repository collection with a field-equality filter.
    pub async fn query_by_text(
        &self,
        repo_key: &str,
        texts: &[String],
        k: usize,
        filter: &Metadata,
    ) -> StoreResult<QueryHits> {
        match self {
            Self::Chroma(s) => s.query_by_text(repo_key, texts, k, filter).await,
            Self::Local(s) => s.query_by_text(repo_key, texts, k, filter),
        }
    }

    /// Embedding query over the repository collection.
    ///
    /// The local backend does not store vectors and reports
    /// [`StoreError::Unsupported`]; callers fall back to the text path.
    pub async fn query_by_embedding(
        &self,
        repo_key: &str,
        vector: Vec<f32>,
        k: usize,
        filter: &Metadata,
    ) -> StoreResult<QueryHits> {
        match self {
            Self::Chroma(s) => s.query_by_embedding(repo_key, vector, k, filter).await,
            Self::Local(_) => Err(StoreError::Unsupported(
                "embedding queries require the chroma backend",
            )),
        }
    }
}

/// Repository key with path separators made filesystem/collection safe.
pub fn safe_repo_key(repo_key: &str) -> String {
    repo_key.replace('/', "_")
}

/// Deterministic collection name for a repository.
pub fn collection_name(repo_key: &str) -> String {
    format!("{}_collection", safe_repo_key(repo_key))
}

/// Globally unique snippet id encoding the repository key.
pub fn snippet_id(repo_key: &str, path: &str) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{repo_key}::{path}::{nanos}")
}

/// Recovers the repository key from a snippet id.
pub fn repo_key_of_id(id: &str) -> Option<&str> {
    id.split("::").next().filter(|s| !s.is_empty())
}

/// Inserts the framework-managed metadata fields.
pub(crate) fn complete_metadata(metadata: &mut Metadata, repo_key: &str, path: &str) {
    metadata.insert("repo_key".into(), Value::String(repo_key.to_string()));
    metadata.insert("filename".into(), Value::String(path.to_string()));
    if !metadata.contains_key("indexed_at") {
        metadata.insert(
            "indexed_at".into(),
            Value::from(chrono::Utc::now().timestamp()),
        );
    }
}

/// Field-equality match of a metadata map against a filter.
pub(crate) fn matches_filter(meta: &Metadata, filter: &Metadata) -> bool {
    filter.iter().all(|(k, want)| meta.get(k) == Some(want))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_ids_encode_the_repo_key() {
        let id = snippet_id("acme/widgets", "src/lib.rs");
        assert_eq!(repo_key_of_id(&id), Some("acme/widgets"));
        assert!(id.contains("src/lib.rs"));
    }

    #[test]
    fn collection_names_are_deterministic() {
        assert_eq!(collection_name("acme/widgets"), "acme_widgets_collection");
        assert_eq!(collection_name("acme/widgets"), collection_name("acme/widgets"));
    }

    #[test]
    fn filter_matching_is_exact_per_field() {
        let mut meta = Metadata::new();
        meta.insert("repo_key".into(), "a/b".into());
        meta.insert("language".into(), "rust".into());

        let mut filter = Metadata::new();
        filter.insert("repo_key".into(), "a/b".into());
        assert!(matches_filter(&meta, &filter));

        filter.insert("language".into(), "go".into());
        assert!(!matches_filter(&meta, &filter));
    }
}
