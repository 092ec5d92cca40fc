//! Context retrieval for changed files.
//!
//! For each `(repo, file, head commit)` the retriever assembles a
//! [`CodeContext`]: imports recorded for the file, symbol definitions, and
//! snippets similar to the patch (embedding search, degrading to a keyword
//! text search when the patch cannot be embedded or the backend has no
//! vectors). Failures never abort the review; each subquery degrades to an
//! empty section with one warning.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, info, warn};
use vector_store::{Metadata, QueryHits, StoreResult};

use crate::indexer::RepoIndexer;
use crate::keywords::extract_keywords;
use crate::{ChangedFile, CodeContext, CodeSnippet, RepoInfo};

/// Query terms used to surface definition-bearing snippets.
const DEFINITION_TERMS: &[&str] = &["function", "type", "struct", "interface", "const", "var"];

/// Similar-code hits requested per file.
const SIMILAR_TOP_K: usize = 5;

/// Tie-breaking jitter applied per result index so equal distances acquire
/// a stable order.
const SIMILARITY_JITTER: f64 = 0.001;

impl RepoIndexer {
    /// Produces a [`CodeContext`] per changed file.
    pub async fn query_context(
        &self,
        files: &[ChangedFile],
        repo: &RepoInfo,
    ) -> HashMap<String, CodeContext> {
        info!(
            "querying context for {} changed files in {}",
            files.len(),
            self.repo_key
        );
        let commit_hash = repo.head_sha.as_str();

        let mut result = HashMap::new();
        for file in files {
            let language = crate::walk::file_language(&file.path);
            let mut context = CodeContext::default();

            match self.query_imports(&file.path, commit_hash).await {
                Ok(imports) => context.imports = imports,
                Err(e) => warn!("failed to query imports for {}: {e}", file.path),
            }

            match self.query_definitions(&file.path, commit_hash).await {
                Ok(definitions) => context.definitions = definitions,
                Err(e) => warn!("failed to query definitions for {}: {e}", file.path),
            }

            if !file.patch.is_empty() {
                context.similar = self.query_similar(language, &file.patch, commit_hash).await;
            }

            result.insert(file.path.clone(), context);
        }

        debug!("context query completed for {}", self.repo_key);
        result
    }

    /// Imports recorded for a file, grouped by package. A pure metadata
    /// query: the `type=import` rows fully determine the result.
    async fn query_imports(&self, filename: &str, commit_hash: &str) -> StoreResult<Vec<String>> {
        let mut filter = base_filter(&self.repo_key, commit_hash);
        filter.insert("filename".into(), Value::String(filename.into()));
        filter.insert("type".into(), Value::String("import".into()));

        let hits = self
            .store
            .query_by_text(&self.repo_key, &[], 50, &filter)
            .await?;

        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (doc, meta) in hits.documents.iter().zip(hits.metadatas.iter()) {
            let package = meta
                .get("package")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            grouped.entry(package.to_string()).or_default().push(doc.clone());
        }

        let imports: Vec<String> = grouped
            .into_iter()
            .flat_map(|(package, statements)| {
                statements
                    .into_iter()
                    .map(move |stmt| format!("{package}: {stmt}"))
            })
            .collect();
        debug!("found {} imports for {filename}", imports.len());
        Ok(imports)
    }

    /// Symbol definitions recorded for a file, keyed by symbol name (or a
    /// synthesized `type_Lline` key when the name is missing).
    async fn query_definitions(
        &self,
        filename: &str,
        commit_hash: &str,
    ) -> StoreResult<BTreeMap<String, String>> {
        let mut filter = base_filter(&self.repo_key, commit_hash);
        filter.insert("filename".into(), Value::String(filename.into()));

        let terms: Vec<String> = DEFINITION_TERMS.iter().map(|t| t.to_string()).collect();
        let hits = self
            .store
            .query_by_text(&self.repo_key, &terms, 20, &filter)
            .await?;

        let mut definitions = BTreeMap::new();
        for (doc, meta) in hits.documents.iter().zip(hits.metadatas.iter()) {
            // Keyed by symbol name, or synthesized from the kind and line;
            // rows without symbol metadata are plain content snippets and
            // do not belong in this section.
            let key = match meta.get("symbol_name").and_then(Value::as_str) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => match meta.get("symbol_type").and_then(Value::as_str) {
                    Some(symbol_type) if !symbol_type.is_empty() => {
                        let line = meta.get("line_start").and_then(Value::as_i64).unwrap_or(0);
                        format!("{symbol_type}_L{line}")
                    }
                    _ => continue,
                },
            };
            definitions.insert(key, doc.clone());
        }
        debug!("found {} definitions for {filename}", definitions.len());
        Ok(definitions)
    }

    /// Snippets similar to the patch. Embedding search first; keyword text
    /// search when embedding or the vector backend is unavailable.
    async fn query_similar(
        &self,
        language: &str,
        patch: &str,
        commit_hash: &str,
    ) -> Vec<CodeSnippet> {
        let mut filter = base_filter(&self.repo_key, commit_hash);
        if !language.is_empty() {
            filter.insert("language".into(), Value::String(language.into()));
        }

        let hits = match self.embedder.embed_code(language, patch).await {
            Ok(embedding) => {
                match self
                    .store
                    .query_by_embedding(&self.repo_key, embedding, SIMILAR_TOP_K, &filter)
                    .await
                {
                    Ok(hits) => hits,
                    Err(e) => {
                        warn!("embedding query failed: {e}; falling back to text search");
                        match self.text_fallback(patch, &filter).await {
                            Some(hits) => hits,
                            None => return Vec::new(),
                        }
                    }
                }
            }
            Err(e) => {
                warn!("failed to embed patch: {e}; falling back to text search");
                match self.text_fallback(patch, &filter).await {
                    Some(hits) => hits,
                    None => return Vec::new(),
                }
            }
        };

        similar_from_hits(hits)
    }

    async fn text_fallback(&self, patch: &str, filter: &Metadata) -> Option<QueryHits> {
        let terms = extract_keywords(patch);
        if terms.is_empty() {
            return None;
        }
        match self
            .store
            .query_by_text(&self.repo_key, &terms, SIMILAR_TOP_K, filter)
            .await
        {
            Ok(hits) => Some(hits),
            Err(e) => {
                warn!("text query failed: {e}; returning no similar code");
                None
            }
        }
    }
}

fn base_filter(repo_key: &str, commit_hash: &str) -> Metadata {
    let mut filter = Metadata::new();
    filter.insert("repo_key".into(), Value::String(repo_key.into()));
    if !commit_hash.is_empty() {
        filter.insert("commit_hash".into(), Value::String(commit_hash.into()));
    }
    filter
}

/// Converts raw hits into deduplicated, similarity-ranked snippets.
///
/// Distance `d ∈ [0,1]` becomes similarity `1 − d` clamped to ≥ 0, minus a
/// deterministic per-index jitter so ties keep a stable order. Hits are
/// deduplicated by `(filename, line_start, line_end)` before ranking.
fn similar_from_hits(hits: QueryHits) -> Vec<CodeSnippet> {
    let mut seen: HashSet<(String, i64, i64)> = HashSet::new();
    let mut similar = Vec::new();

    for (i, doc) in hits.documents.iter().enumerate() {
        let meta = hits.metadatas.get(i).cloned().unwrap_or_default();
        let filename = meta
            .get("filename")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let line_start = meta.get("line_start").and_then(Value::as_i64).unwrap_or(1);
        let line_end = meta.get("line_end").and_then(Value::as_i64).unwrap_or(1);

        if !seen.insert((filename.clone(), line_start, line_end)) {
            continue;
        }

        let distance = hits.distances.get(i).copied().unwrap_or(1.0) as f64;
        let similarity = (1.0 - distance).max(0.0) - SIMILARITY_JITTER * i as f64;

        similar.push(CodeSnippet {
            filename,
            content: doc.clone(),
            similarity,
            line_start,
            line_end,
        });
    }

    similar.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    similar
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;
    use vector_store::{EmbeddingClient, StoreConfig, VectorStore};

    fn hit(filename: &str, start: i64, end: i64, distance: f32) -> (String, Metadata, f32) {
        let mut meta = Metadata::new();
        meta.insert("filename".into(), filename.into());
        meta.insert("line_start".into(), start.into());
        meta.insert("line_end".into(), end.into());
        (format!("doc-{filename}-{start}"), meta, distance)
    }

    fn hits_of(items: Vec<(String, Metadata, f32)>) -> QueryHits {
        let mut hits = QueryHits::default();
        for (i, (doc, meta, distance)) in items.into_iter().enumerate() {
            hits.ids.push(format!("id{i}"));
            hits.documents.push(doc);
            hits.metadatas.push(meta);
            hits.distances.push(distance);
        }
        hits
    }

    #[test]
    fn similar_hits_are_deduplicated_and_sorted() {
        let hits = hits_of(vec![
            hit("a.rs", 1, 10, 0.4),
            hit("a.rs", 1, 10, 0.4), // duplicate span, dropped
            hit("b.rs", 5, 9, 0.1),
        ]);

        let similar = similar_from_hits(hits);
        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].filename, "b.rs");
        assert!(similar[0].similarity > similar[1].similarity);
    }

    #[test]
    fn similarity_is_clamped_and_jittered() {
        let hits = hits_of(vec![hit("a.rs", 1, 2, 0.5), hit("b.rs", 1, 2, 0.5)]);
        let similar = similar_from_hits(hits);
        // Equal distances separated deterministically by the index jitter.
        assert!((similar[0].similarity - 0.5).abs() < 1e-9);
        assert!((similar[1].similarity - 0.499).abs() < 1e-9);

        let clamped = similar_from_hits(hits_of(vec![hit("c.rs", 1, 2, 1.8)]));
        assert!(clamped[0].similarity <= 0.0);
    }

    #[tokio::test]
    async fn indexed_imports_and_definitions_surface_in_context() {
        let repo = tempdir().expect("repo");
        std::fs::write(
            repo.path().join("main.go"),
            "package main\n\nimport (\n    \"fmt\"\n)\n\ntype Config struct {}\n\nfunc Run() {}\n",
        )
        .expect("write");

        let store_dir = tempdir().expect("store");
        let cfg = StoreConfig {
            kind: vector_store::StorageKind::Local,
            chroma_host: String::new(),
            chroma_port: 0,
            chroma_path: String::new(),
            chroma_ssl: false,
            chroma_tenant: "default".into(),
            chroma_database: "default".into(),
            local_storage_path: store_dir.path().to_path_buf(),
            embedding_dim: 8,
        };
        let store = Arc::new(VectorStore::from_config(&cfg, None).expect("store"));
        let indexer = RepoIndexer::new(
            "acme/widgets".into(),
            store,
            EmbeddingClient::Simple(Default::default()),
            crate::CloneConfig::default(),
        );
        indexer
            .index_repository(Some(repo.path().to_path_buf()), "head9")
            .await
            .expect("index");

        let files = vec![ChangedFile {
            path: "main.go".into(),
            patch: String::new(), // no patch: similar-code query is skipped
        }];
        let repo_info = RepoInfo {
            owner: "acme".into(),
            name: "widgets".into(),
            language: "go".into(),
            branch: "main".into(),
            head_sha: "head9".into(),
        };

        let contexts = indexer.query_context(&files, &repo_info).await;
        let ctx = contexts.get("main.go").expect("context");

        assert_eq!(ctx.imports, vec!["fmt: import \"fmt\"".to_string()]);
        assert_eq!(
            ctx.definitions.get("Config").map(String::as_str),
            Some("type Config struct {}")
        );
        assert!(ctx.similar.is_empty());
    }

    #[tokio::test]
    async fn query_context_degrades_to_keyword_search_on_local_store() {
        let store_dir = tempdir().expect("store");
        let cfg = StoreConfig {
            kind: vector_store::StorageKind::Local,
            chroma_host: String::new(),
            chroma_port: 0,
            chroma_path: String::new(),
            chroma_ssl: false,
            chroma_tenant: "default".into(),
            chroma_database: "default".into(),
            local_storage_path: store_dir.path().to_path_buf(),
            embedding_dim: 8,
        };
        let store = Arc::new(VectorStore::from_config(&cfg, None).expect("store"));

        // Seed one snippet sharing identifiers with the patch below.
        let mut meta = Metadata::new();
        meta.insert("language".into(), "rust".into());
        meta.insert("line_start".into(), 1.into());
        meta.insert("line_end".into(), 3.into());
        meta.insert("commit_hash".into(), "head1".into());
        store
            .save_snippet(
                "acme/widgets",
                "src/pool.rs",
                "fn checkout_connection(pool: &ConnectionPool) {}",
                meta,
            )
            .await
            .expect("seed");

        let indexer = RepoIndexer::new(
            "acme/widgets".into(),
            store,
            EmbeddingClient::Simple(Default::default()),
            crate::CloneConfig::default(),
        );

        let files = vec![ChangedFile {
            path: "src/pool.rs".into(),
            patch: "+ let conn = checkout_connection(&shared_pool);".into(),
        }];
        let repo = RepoInfo {
            owner: "acme".into(),
            name: "widgets".into(),
            language: "rust".into(),
            branch: "main".into(),
            head_sha: "head1".into(),
        };

        let contexts = indexer.query_context(&files, &repo).await;
        let ctx = contexts.get("src/pool.rs").expect("context");
        // The local backend cannot answer embedding queries; the keyword
        // fallback still surfaces the seeded snippet.
        assert_eq!(ctx.similar.len(), 1);
        assert!(ctx.similar[0].content.contains("checkout_connection"));
    }
}
