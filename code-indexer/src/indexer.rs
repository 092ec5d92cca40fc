//! Per-repository indexer: walk, chunk and store snippets.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};
use vector_store::{EmbeddingClient, Metadata, VectorStore};

use crate::config::CloneConfig;
use crate::errors::IndexResult;
use crate::extract::{extract_definitions, extract_imports};
use crate::git::{clone_or_update, split_repo_key};
use crate::walk::{file_language, scan_repository_files};

/// Files above this size are split into line-bounded chunks.
const LARGE_FILE_BYTES: usize = 50_000;

/// Lines per chunk for large files.
const CHUNK_LINES: usize = 500;

/// Counters reported after an indexing run.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStats {
    pub files_indexed: usize,
    pub snippets_indexed: usize,
}

/// Indexer bound to one repository key.
pub struct RepoIndexer {
    pub(crate) repo_key: String,
    pub(crate) store: Arc<VectorStore>,
    pub(crate) embedder: EmbeddingClient,
    clone_cfg: CloneConfig,
    /// Files indexed during this process lifetime. Insert-only.
    indexed: RwLock<HashSet<String>>,
}

impl RepoIndexer {
    pub fn new(
        repo_key: String,
        store: Arc<VectorStore>,
        embedder: EmbeddingClient,
        clone_cfg: CloneConfig,
    ) -> Self {
        Self {
            repo_key,
            store,
            embedder,
            clone_cfg,
            indexed: RwLock::new(HashSet::new()),
        }
    }

    pub fn repo_key(&self) -> &str {
        &self.repo_key
    }

    /// Indexes the whole repository at `git_ref`.
    ///
    /// When `repo_path` is absent or not a directory, a working copy is
    /// cloned or fast-forwarded into the per-repo temp location first.
    pub async fn index_repository(
        &self,
        repo_path: Option<PathBuf>,
        git_ref: &str,
    ) -> IndexResult<IndexStats> {
        let start = Instant::now();
        info!("indexing repository {} (ref: {git_ref})", self.repo_key);

        let local = match repo_path.filter(|p| p.is_dir()) {
            Some(path) => path,
            None => {
                let (owner, repo) = split_repo_key(&self.repo_key)?;
                clone_or_update(
                    self.clone_cfg.clone(),
                    owner.to_string(),
                    repo.to_string(),
                    git_ref.to_string(),
                )
                .await?
            }
        };

        let mut stats = IndexStats::default();
        for rel in scan_repository_files(&local) {
            let filename = rel.to_string_lossy().replace('\\', "/");
            let content = match std::fs::read_to_string(local.join(&rel)) {
                Ok(c) => c,
                Err(e) => {
                    debug!("skipping {filename}: {e}");
                    continue;
                }
            };

            match self.index_file(&filename, &content, git_ref).await {
                Ok(0) => {}
                Ok(snippets) => {
                    stats.files_indexed += 1;
                    stats.snippets_indexed += snippets;
                    if stats.files_indexed % 100 == 0 {
                        info!("indexed {} files so far", stats.files_indexed);
                    }
                }
                Err(e) => warn!("failed to index {filename}: {e}"),
            }
        }

        info!(
            "indexed repository {}: {} files, {} snippets in {:?}",
            self.repo_key,
            stats.files_indexed,
            stats.snippets_indexed,
            start.elapsed()
        );
        Ok(stats)
    }

    /// Refreshes the index between two commits.
    ///
    /// Differential indexing is permitted but not required; a full re-index
    /// at the target commit keeps the commit-partitioned rows correct.
    pub async fn update_index(&self, from_commit: &str, to_commit: &str) -> IndexResult<IndexStats> {
        debug!(
            "updating index for {} ({from_commit} -> {to_commit})",
            self.repo_key
        );
        self.index_repository(None, to_commit).await
    }

    /// Stores one file as one snippet, or as 500-line chunks when large.
    async fn index_file(
        &self,
        filename: &str,
        content: &str,
        commit_hash: &str,
    ) -> IndexResult<usize> {
        if content.is_empty() {
            return Ok(0);
        }

        {
            let mut indexed = self.indexed.write().unwrap_or_else(|e| e.into_inner());
            indexed.insert(filename.to_string());
        }

        let language = file_language(filename);
        let mut snippets = if content.len() > LARGE_FILE_BYTES {
            self.index_large_file(filename, language, content, commit_hash)
                .await?
        } else {
            let line_end = content.lines().count().max(1);
            let metadata =
                snippet_metadata(&self.repo_key, filename, language, 1, line_end, commit_hash);
            self.store
                .save_snippet(&self.repo_key, filename, content, metadata)
                .await?;
            1
        };

        snippets += self
            .index_structure(filename, language, content, commit_hash)
            .await?;
        Ok(snippets)
    }

    /// Stores companion rows for imports and symbol definitions; these are
    /// the rows the context retriever filters on.
    async fn index_structure(
        &self,
        filename: &str,
        language: &str,
        content: &str,
        commit_hash: &str,
    ) -> IndexResult<usize> {
        if language == "text" {
            return Ok(0);
        }
        let mut snippets = 0;

        for import in extract_imports(content, language) {
            let mut metadata = snippet_metadata(
                &self.repo_key,
                filename,
                language,
                import.line,
                import.line,
                commit_hash,
            );
            metadata.insert("type".into(), Value::String("import".into()));
            metadata.insert("package".into(), Value::String(import.package));
            self.store
                .save_snippet(&self.repo_key, filename, &import.statement, metadata)
                .await?;
            snippets += 1;
        }

        for definition in extract_definitions(content, language) {
            let mut metadata = snippet_metadata(
                &self.repo_key,
                filename,
                language,
                definition.line,
                definition.line,
                commit_hash,
            );
            metadata.insert("symbol_name".into(), Value::String(definition.name));
            metadata.insert("symbol_type".into(), Value::String(definition.kind.into()));
            self.store
                .save_snippet(&self.repo_key, filename, &definition.signature, metadata)
                .await?;
            snippets += 1;
        }

        Ok(snippets)
    }

    async fn index_large_file(
        &self,
        filename: &str,
        language: &str,
        content: &str,
        commit_hash: &str,
    ) -> IndexResult<usize> {
        let lines: Vec<&str> = content.lines().collect();
        debug!(
            "chunking large file {filename}: {} bytes, {} lines",
            content.len(),
            lines.len()
        );

        let mut snippets = 0;
        for start in (0..lines.len()).step_by(CHUNK_LINES) {
            let end = (start + CHUNK_LINES).min(lines.len());
            let chunk = lines[start..end].join("\n");
            let metadata = snippet_metadata(
                &self.repo_key,
                filename,
                language,
                start + 1,
                end,
                commit_hash,
            );
            self.store
                .save_snippet(&self.repo_key, filename, &chunk, metadata)
                .await?;
            snippets += 1;
        }
        Ok(snippets)
    }
}

fn snippet_metadata(
    repo_key: &str,
    filename: &str,
    language: &str,
    line_start: usize,
    line_end: usize,
    commit_hash: &str,
) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("repo_key".into(), Value::String(repo_key.into()));
    metadata.insert("filename".into(), Value::String(filename.into()));
    metadata.insert("language".into(), Value::String(language.into()));
    metadata.insert("line_start".into(), Value::from(line_start as i64));
    metadata.insert("line_end".into(), Value::from(line_end as i64));
    metadata.insert(
        "indexed_at".into(),
        Value::from(chrono::Utc::now().timestamp()),
    );
    metadata.insert("commit_hash".into(), Value::String(commit_hash.into()));
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;
    use vector_store::StoreConfig;

    fn local_indexer(store_dir: &std::path::Path) -> RepoIndexer {
        let cfg = StoreConfig {
            kind: vector_store::StorageKind::Local,
            chroma_host: String::new(),
            chroma_port: 0,
            chroma_path: String::new(),
            chroma_ssl: false,
            chroma_tenant: "default".into(),
            chroma_database: "default".into(),
            local_storage_path: store_dir.to_path_buf(),
            embedding_dim: 8,
        };
        let store = Arc::new(VectorStore::from_config(&cfg, None).expect("store"));
        RepoIndexer::new(
            "acme/widgets".into(),
            store,
            EmbeddingClient::Simple(Default::default()),
            CloneConfig::default(),
        )
    }

    #[tokio::test]
    async fn indexing_a_working_copy_stores_snippets_per_file() {
        let repo = tempdir().expect("repo");
        fs::create_dir_all(repo.path().join("src")).expect("mkdir");
        fs::write(
            repo.path().join("src/lib.rs"),
            "use serde::Serialize;\n\npub fn add() {}\n",
        )
        .expect("write");
        fs::write(repo.path().join("README.md"), "# readme").expect("write");

        let store_dir = tempdir().expect("store");
        let indexer = local_indexer(store_dir.path());

        let stats = indexer
            .index_repository(Some(repo.path().to_path_buf()), "abc123")
            .await
            .expect("index");
        assert_eq!(stats.files_indexed, 2);
        // lib.rs: content + one import row + one definition row; README: content.
        assert_eq!(stats.snippets_indexed, 4);

        let ids = indexer
            .store
            .list_by_file("acme/widgets", "src/lib.rs")
            .await
            .expect("list");
        assert_eq!(ids.len(), 3);

        let mut saw_content = false;
        let mut saw_import = false;
        let mut saw_definition = false;
        for id in &ids {
            let (_, metadata) = indexer.store.get_snippet(id).await.expect("get");
            assert_eq!(metadata.get("language"), Some(&Value::from("rust")));
            assert_eq!(metadata.get("commit_hash"), Some(&Value::from("abc123")));
            if metadata.get("type") == Some(&Value::from("import")) {
                assert_eq!(metadata.get("package"), Some(&Value::from("serde")));
                saw_import = true;
            } else if metadata.get("symbol_name").is_some() {
                assert_eq!(metadata.get("symbol_name"), Some(&Value::from("add")));
                saw_definition = true;
            } else {
                assert_eq!(metadata.get("line_start"), Some(&Value::from(1)));
                saw_content = true;
            }
        }
        assert!(saw_content && saw_import && saw_definition);
    }

    #[tokio::test]
    async fn large_files_split_into_500_line_chunks() {
        let repo = tempdir().expect("repo");
        // ~60 KB over 1200 lines -> 3 chunks.
        let line = "let value = compute_something_interesting(42);\n";
        let content = line.repeat(1200);
        assert!(content.len() > LARGE_FILE_BYTES);
        fs::write(repo.path().join("big.rs"), &content).expect("write");

        let store_dir = tempdir().expect("store");
        let indexer = local_indexer(store_dir.path());

        let stats = indexer
            .index_repository(Some(repo.path().to_path_buf()), "head")
            .await
            .expect("index");
        assert_eq!(stats.files_indexed, 1);
        assert_eq!(stats.snippets_indexed, 3);

        let ids = indexer
            .store
            .list_by_file("acme/widgets", "big.rs")
            .await
            .expect("list");
        assert_eq!(ids.len(), 3);
    }
}
