//! Local filesystem backend.
//!
//! Layout: `<base>/<repo-key-safe>/commits/<short-sha>/<id>.code` with a
//! sibling `<id>.meta` JSON file; snippets without a commit hash land under
//! `<base>/<repo-key-safe>/default/`. Metadata is cached in memory under a
//! read-write lock. Text queries score keyword overlap over filtered
//! snippets; embedding queries are not supported by this backend.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;
use tracing::trace;

use crate::errors::{StoreError, StoreResult};
use crate::{complete_metadata, matches_filter, safe_repo_key, snippet_id, Metadata, QueryHits};

const CODE_EXT: &str = "code";
const META_EXT: &str = "meta";

/// Filesystem-backed snippet store.
pub struct LocalStore {
    base: PathBuf,
    /// id → metadata cache.
    metadata: RwLock<HashMap<String, Metadata>>,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").field("base", &self.base).finish()
    }
}

impl LocalStore {
    /// Opens (and creates if missing) the storage directory.
    pub fn new(base: &Path) -> StoreResult<Self> {
        fs::create_dir_all(base)?;
        Ok(Self {
            base: base.to_path_buf(),
            metadata: RwLock::new(HashMap::new()),
        })
    }

    /// Directory for a repository partition. The short (8 char) commit hash
    /// partitions re-indexed snippets; absent hashes use `default`.
    fn partition_dir(&self, repo_key: &str, commit_hash: Option<&str>) -> PathBuf {
        let repo_dir = self.base.join(safe_repo_key(repo_key));
        match commit_hash.filter(|h| !h.is_empty()) {
            Some(hash) => {
                let short = &hash[..hash.len().min(8)];
                repo_dir.join("commits").join(short)
            }
            None => repo_dir.join("default"),
        }
    }

    /// All existing partition directories of a repository.
    fn partition_dirs(&self, repo_key: &str) -> Vec<PathBuf> {
        let repo_dir = self.base.join(safe_repo_key(repo_key));
        let mut dirs = Vec::new();
        let default = repo_dir.join("default");
        if default.is_dir() {
            dirs.push(default);
        }
        if let Ok(entries) = fs::read_dir(repo_dir.join("commits")) {
            for entry in entries.flatten() {
                if entry.path().is_dir() {
                    dirs.push(entry.path());
                }
            }
        }
        dirs
    }

    pub fn save_snippet(
        &self,
        repo_key: &str,
        path: &str,
        content: &str,
        mut metadata: Metadata,
    ) -> StoreResult<String> {
        let id = snippet_id(repo_key, path);
        complete_metadata(&mut metadata, repo_key, path);
        metadata.insert("id".into(), Value::String(id.clone()));

        let commit_hash = metadata
            .get("commit_hash")
            .and_then(Value::as_str)
            .map(str::to_string);
        let dir = self.partition_dir(repo_key, commit_hash.as_deref());
        fs::create_dir_all(&dir)?;

        let stem = file_stem(&id);
        fs::write(dir.join(format!("{stem}.{CODE_EXT}")), content)?;
        fs::write(
            dir.join(format!("{stem}.{META_EXT}")),
            serde_json::to_vec(&metadata)?,
        )?;

        let mut cache = self.metadata.write().unwrap_or_else(|e| e.into_inner());
        cache.insert(id.clone(), metadata);
        trace!("stored snippet {id} under {}", dir.display());
        Ok(id)
    }

    pub fn get_snippet(&self, id: &str) -> StoreResult<(String, Metadata)> {
        let path = self
            .find_snippet_file(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let content = fs::read_to_string(&path)?;

        {
            let cache = self.metadata.read().unwrap_or_else(|e| e.into_inner());
            if let Some(meta) = cache.get(id) {
                return Ok((content, meta.clone()));
            }
        }

        let meta_path = path.with_extension(META_EXT);
        let metadata: Metadata = serde_json::from_slice(&fs::read(meta_path)?)?;
        let mut cache = self.metadata.write().unwrap_or_else(|e| e.into_inner());
        cache.insert(id.to_string(), metadata.clone());
        Ok((content, metadata))
    }

    pub fn delete_snippet(&self, id: &str) -> StoreResult<()> {
        if let Some(path) = self.find_snippet_file(id)? {
            fs::remove_file(&path)?;
            let meta_path = path.with_extension(META_EXT);
            if meta_path.exists() {
                fs::remove_file(meta_path)?;
            }
        }
        let mut cache = self.metadata.write().unwrap_or_else(|e| e.into_inner());
        cache.remove(id);
        Ok(())
    }

    pub fn list_by_file(&self, repo_key: &str, path: &str) -> StoreResult<Vec<String>> {
        let mut filter = Metadata::new();
        filter.insert("filename".into(), path.into());
        Ok(self
            .snippets_matching(repo_key, &filter)?
            .into_iter()
            .map(|(id, _, _)| id)
            .collect())
    }

    pub fn list_by_repo(&self, repo_key: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .snippets_matching(repo_key, &Metadata::new())?
            .into_iter()
            .map(|(id, _, _)| id)
            .collect())
    }

    /// Keyword-overlap text query: a snippet scores by how many query terms
    /// its content contains; distance is `1 − matched/total`. An empty term
    /// list turns this into a pure metadata query returning every match.
    pub fn query_by_text(
        &self,
        repo_key: &str,
        texts: &[String],
        k: usize,
        filter: &Metadata,
    ) -> StoreResult<QueryHits> {
        let terms: Vec<String> = texts.iter().map(|t| t.to_lowercase()).collect();
        let mut scored: Vec<(f32, String, String, Metadata)> = Vec::new();

        for (id, content, meta) in self.snippets_matching(repo_key, filter)? {
            if terms.is_empty() {
                scored.push((0.0, id, content, meta));
                continue;
            }
            let haystack = content.to_lowercase();
            let matched = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
            if matched == 0 {
                continue;
            }
            let distance = 1.0 - matched as f32 / terms.len() as f32;
            scored.push((distance, id, content, meta));
        }

        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        let mut hits = QueryHits::default();
        for (distance, id, content, meta) in scored {
            hits.distances.push(distance);
            hits.ids.push(id);
            hits.documents.push(content);
            hits.metadatas.push(meta);
        }
        Ok(hits)
    }

    fn find_snippet_file(&self, id: &str) -> StoreResult<Option<PathBuf>> {
        let repo_key = crate::repo_key_of_id(id)
            .ok_or_else(|| StoreError::Decode(format!("id does not encode a repo key: {id}")))?;
        let name = format!("{}.{CODE_EXT}", file_stem(id));
        for dir in self.partition_dirs(repo_key) {
            let candidate = dir.join(&name);
            if candidate.is_file() {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// All snippets of a repository whose metadata matches the filter.
    fn snippets_matching(
        &self,
        repo_key: &str,
        filter: &Metadata,
    ) -> StoreResult<Vec<(String, String, Metadata)>> {
        let mut out = Vec::new();
        for dir in self.partition_dirs(repo_key) {
            let entries = match fs::read_dir(&dir) {
                Ok(e) => e,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(META_EXT) {
                    continue;
                }
                let metadata: Metadata = match fs::read(&path)
                    .ok()
                    .and_then(|bytes| serde_json::from_slice(&bytes).ok())
                {
                    Some(m) => m,
                    None => continue,
                };
                if !matches_filter(&metadata, filter) {
                    continue;
                }
                let id = match metadata.get("id").and_then(Value::as_str) {
                    Some(id) => id.to_string(),
                    None => continue,
                };
                let content = match fs::read_to_string(path.with_extension(CODE_EXT)) {
                    Ok(c) => c,
                    Err(_) => continue,
                };
                out.push((id, content, metadata));
            }
        }
        Ok(out)
    }
}

/// Filesystem-safe file stem for a snippet id.
fn file_stem(id: &str) -> String {
    id.replace(['/', ':'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn meta(pairs: &[(&str, Value)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn save_then_get_roundtrips_content_and_metadata_superset() {
        let dir = tempdir().expect("tempdir");
        let store = LocalStore::new(dir.path()).expect("store");

        let supplied = meta(&[
            ("language", "rust".into()),
            ("line_start", 1.into()),
            ("line_end", 10.into()),
        ]);
        let id = store
            .save_snippet("acme/widgets", "src/lib.rs", "fn demo() {}", supplied)
            .expect("save");

        let (content, metadata) = store.get_snippet(&id).expect("get");
        assert_eq!(content, "fn demo() {}");
        // Framework-managed fields are added on top of what was supplied.
        assert_eq!(metadata.get("language"), Some(&Value::from("rust")));
        assert_eq!(metadata.get("repo_key"), Some(&Value::from("acme/widgets")));
        assert_eq!(metadata.get("filename"), Some(&Value::from("src/lib.rs")));
        assert!(metadata.contains_key("indexed_at"));
    }

    #[test]
    fn commit_hash_partitions_the_layout() {
        let dir = tempdir().expect("tempdir");
        let store = LocalStore::new(dir.path()).expect("store");

        let supplied = meta(&[("commit_hash", "0123456789abcdef".into())]);
        let id = store
            .save_snippet("acme/widgets", "a.rs", "a", supplied)
            .expect("save");

        let partition = dir.path().join("acme_widgets").join("commits").join("01234567");
        assert!(partition.is_dir());
        // Still resolvable by id alone.
        assert!(store.get_snippet(&id).is_ok());
    }

    #[test]
    fn list_by_file_filters_on_filename() {
        let dir = tempdir().expect("tempdir");
        let store = LocalStore::new(dir.path()).expect("store");

        store
            .save_snippet("acme/widgets", "a.rs", "a", Metadata::new())
            .expect("save a");
        store
            .save_snippet("acme/widgets", "b.rs", "b", Metadata::new())
            .expect("save b");

        let ids = store.list_by_file("acme/widgets", "a.rs").expect("list");
        assert_eq!(ids.len(), 1);
        assert_eq!(store.list_by_repo("acme/widgets").expect("list").len(), 2);
    }

    #[test]
    fn text_query_scores_keyword_overlap() {
        let dir = tempdir().expect("tempdir");
        let store = LocalStore::new(dir.path()).expect("store");

        store
            .save_snippet(
                "acme/widgets",
                "net.rs",
                "fn connect_database(pool: Pool) {}",
                Metadata::new(),
            )
            .expect("save");
        store
            .save_snippet("acme/widgets", "ui.rs", "fn render_button() {}", Metadata::new())
            .expect("save");

        let hits = store
            .query_by_text(
                "acme/widgets",
                &["database".into(), "pool".into()],
                5,
                &Metadata::new(),
            )
            .expect("query");
        assert_eq!(hits.ids.len(), 1);
        assert!(hits.documents[0].contains("connect_database"));
        assert!(hits.distances[0] < 0.5);
    }

    #[test]
    fn delete_removes_code_and_meta() {
        let dir = tempdir().expect("tempdir");
        let store = LocalStore::new(dir.path()).expect("store");

        let id = store
            .save_snippet("acme/widgets", "a.rs", "a", Metadata::new())
            .expect("save");
        store.delete_snippet(&id).expect("delete");
        assert!(matches!(
            store.get_snippet(&id),
            Err(StoreError::NotFound(_))
        ));
        // Idempotent.
        store.delete_snippet(&id).expect("re-delete");
    }
}
