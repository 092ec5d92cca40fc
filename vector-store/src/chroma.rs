//! Chroma backend over the v2 HTTP API.
//!
//! Chroma v2 specifics handled here:
//! - collections live under `/tenants/{tenant}/databases/{database}`; the
//!   database is created on demand (create-if-missing);
//! - equality filters must be rewritten into `{"$and":[{field:{"$eq":v}}]}`;
//! - `query` requires a `query_embeddings` field even for text queries, so a
//!   placeholder ε-vector at the collection dimension is always attached;
//! - query vectors whose dimension does not match the collection are padded
//!   with ε or truncated, which keeps the query path alive when mixed
//!   embedding models have been used historically.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, trace, warn};

use crate::config::StoreConfig;
use crate::embeddings::EmbeddingClient;
use crate::errors::{StoreError, StoreResult};
use crate::{collection_name, complete_metadata, repo_key_of_id, snippet_id, Metadata, QueryHits};

const STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Small non-zero value used for placeholder vectors and dimension padding.
const EPSILON: f32 = 1e-5;

/// Chroma-backed snippet store.
pub struct ChromaStore {
    http: reqwest::Client,
    base_url: String,
    tenant: String,
    database: String,
    dim: usize,
    embedder: Option<EmbeddingClient>,
    /// Collection name → collection id. Read path dominant.
    collections: RwLock<HashMap<String, String>>,
}

impl std::fmt::Debug for ChromaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromaStore")
            .field("base_url", &self.base_url)
            .field("tenant", &self.tenant)
            .field("database", &self.database)
            .field("dim", &self.dim)
            .finish()
    }
}

impl ChromaStore {
    /// Creates the store from validated configuration.
    pub fn new(cfg: &StoreConfig, embedder: Option<EmbeddingClient>) -> StoreResult<Self> {
        cfg.validate()?;
        let http = reqwest::Client::builder()
            .timeout(STORE_TIMEOUT)
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.chroma_base_url(),
            tenant: cfg.chroma_tenant.clone(),
            database: cfg.chroma_database.clone(),
            dim: cfg.embedding_dim,
            embedder,
            collections: RwLock::new(HashMap::new()),
        })
    }

    fn db_url(&self) -> String {
        format!(
            "{}/tenants/{}/databases",
            self.base_url,
            urlencoding::encode(&self.tenant)
        )
    }

    fn collections_url(&self) -> String {
        format!(
            "{}/tenants/{}/databases/{}/collections",
            self.base_url,
            urlencoding::encode(&self.tenant),
            urlencoding::encode(&self.database)
        )
    }

    fn collection_url(&self, collection_id: &str, op: &str) -> String {
        format!("{}/{}/{}", self.collections_url(), collection_id, op)
    }

    /// Creates the configured database when it does not exist yet.
    ///
    /// Failures are logged and tolerated; the subsequent operation surfaces
    /// the real error if the database is genuinely unusable.
    async fn ensure_database(&self) {
        let url = self.db_url();
        let exists = match self.http.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp
                .json::<Vec<Value>>()
                .await
                .map(|dbs| {
                    dbs.iter()
                        .any(|d| d.get("name").and_then(Value::as_str) == Some(self.database.as_str()))
                })
                .unwrap_or(false),
            _ => false,
        };
        if exists {
            return;
        }

        trace!("creating chroma database {}", self.database);
        let body = json!({ "name": self.database });
        match self.http.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => warn!(
                "failed to create chroma database {}: status {}",
                self.database,
                resp.status()
            ),
            Err(e) => warn!("failed to create chroma database {}: {e}", self.database),
        }
    }

    /// Returns the collection id for a repository, creating the collection
    /// lazily on first use. Ids are cached under a read-write lock.
    async fn get_or_create_collection(&self, repo_key: &str) -> StoreResult<String> {
        let name = collection_name(repo_key);

        {
            let cache = self.collections.read().unwrap_or_else(|e| e.into_inner());
            if let Some(id) = cache.get(&name) {
                return Ok(id.clone());
            }
        }

        self.ensure_database().await;

        let body = json!({ "name": name, "get_or_create": true });
        let resp = self
            .http
            .post(self.collections_url())
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(StoreError::from_response(resp).await);
        }
        let created: Value = resp.json().await?;
        let id = created
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Decode("no `id` field in collection response".into()))?
            .to_string();

        trace!("collection {name} -> {id}");
        let mut cache = self.collections.write().unwrap_or_else(|e| e.into_inner());
        cache.insert(name, id.clone());
        Ok(id)
    }

    /// Stores a snippet, attaching an embedding when the embedder succeeds.
    pub async fn save_snippet(
        &self,
        repo_key: &str,
        path: &str,
        content: &str,
        mut metadata: Metadata,
    ) -> StoreResult<String> {
        let collection = self.get_or_create_collection(repo_key).await?;
        let id = snippet_id(repo_key, path);
        complete_metadata(&mut metadata, repo_key, path);

        let embedding = match &self.embedder {
            Some(embedder) => {
                let language = metadata
                    .get("language")
                    .and_then(Value::as_str)
                    .unwrap_or("text");
                match embedder.embed_code(language, content).await {
                    Ok(v) => Some(adjust_dimension(v, self.dim)),
                    Err(e) => {
                        warn!("embedding failed for {path}: {e}; storing without embedding");
                        None
                    }
                }
            }
            None => None,
        };

        let mut body = json!({
            "ids": [&id],
            "documents": [content],
            "metadatas": [Value::Object(metadata)],
        });
        if let Some(v) = embedding {
            body["embeddings"] = json!([v]);
        }

        let url = self.collection_url(&collection, "add");
        debug!("POST {url}");
        let resp = self.http.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(StoreError::from_response(resp).await);
        }
        Ok(id)
    }

    pub async fn get_snippet(&self, id: &str) -> StoreResult<(String, Metadata)> {
        let repo_key = repo_key_of_id(id)
            .ok_or_else(|| StoreError::Decode(format!("id does not encode a repo key: {id}")))?;
        let collection = self.get_or_create_collection(repo_key).await?;

        let body = json!({ "ids": [id], "include": ["documents", "metadatas"] });
        let url = self.collection_url(&collection, "get");
        let resp = self.http.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(StoreError::from_response(resp).await);
        }
        let out: GetResponse = resp.json().await?;

        let content = out
            .documents
            .unwrap_or_default()
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let metadata = out
            .metadatas
            .unwrap_or_default()
            .into_iter()
            .next()
            .flatten()
            .unwrap_or_default();
        Ok((content, metadata))
    }

    pub async fn delete_snippet(&self, id: &str) -> StoreResult<()> {
        let repo_key = repo_key_of_id(id)
            .ok_or_else(|| StoreError::Decode(format!("id does not encode a repo key: {id}")))?;
        let collection = self.get_or_create_collection(repo_key).await?;

        let body = json!({ "ids": [id] });
        let url = self.collection_url(&collection, "delete");
        let resp = self.http.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(StoreError::from_response(resp).await);
        }
        Ok(())
    }

    pub async fn list_by_file(&self, repo_key: &str, path: &str) -> StoreResult<Vec<String>> {
        let mut filter = Metadata::new();
        filter.insert("repo_key".into(), repo_key.into());
        filter.insert("filename".into(), path.into());
        self.list_ids(repo_key, &filter).await
    }

    pub async fn list_by_repo(&self, repo_key: &str) -> StoreResult<Vec<String>> {
        let mut filter = Metadata::new();
        filter.insert("repo_key".into(), repo_key.into());
        self.list_ids(repo_key, &filter).await
    }

    async fn list_ids(&self, repo_key: &str, filter: &Metadata) -> StoreResult<Vec<String>> {
        let collection = self.get_or_create_collection(repo_key).await?;

        let mut body = json!({ "include": [] });
        if let Some(clause) = format_filter(filter) {
            body["where"] = clause;
        }
        let url = self.collection_url(&collection, "get");
        let resp = self.http.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(StoreError::from_response(resp).await);
        }
        let out: GetResponse = resp.json().await?;
        Ok(out.ids)
    }

    pub async fn query_by_text(
        &self,
        repo_key: &str,
        texts: &[String],
        k: usize,
        filter: &Metadata,
    ) -> StoreResult<QueryHits> {
        // Chroma requires query_embeddings even for text queries; send a
        // placeholder ε-vector at the collection dimension.
        let placeholder = vec![EPSILON; self.dim];
        self.query(repo_key, Some(texts), placeholder, k, filter)
            .await
    }

    pub async fn query_by_embedding(
        &self,
        repo_key: &str,
        vector: Vec<f32>,
        k: usize,
        filter: &Metadata,
    ) -> StoreResult<QueryHits> {
        let vector = adjust_dimension(vector, self.dim);
        self.query(repo_key, None, vector, k, filter).await
    }

    async fn query(
        &self,
        repo_key: &str,
        texts: Option<&[String]>,
        embedding: Vec<f32>,
        k: usize,
        filter: &Metadata,
    ) -> StoreResult<QueryHits> {
        let collection = self.get_or_create_collection(repo_key).await?;

        let mut body = json!({
            "n_results": k,
            "query_embeddings": [embedding],
            "include": ["documents", "metadatas", "distances"],
        });
        if let Some(texts) = texts {
            if !texts.is_empty() {
                body["query_texts"] = json!(texts);
            }
        }
        if let Some(clause) = format_filter(filter) {
            body["where"] = clause;
        }

        let url = self.collection_url(&collection, "query");
        debug!("POST {url}");
        let resp = self.http.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(StoreError::from_response(resp).await);
        }
        let out: QueryResponse = resp.json().await?;

        // Single query vector, so only the first result group is relevant.
        let ids = out.ids.into_iter().next().unwrap_or_default();
        let documents = out
            .documents
            .unwrap_or_default()
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        let metadatas = out
            .metadatas
            .unwrap_or_default()
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        let distances = out
            .distances
            .unwrap_or_default()
            .into_iter()
            .next()
            .unwrap_or_default();

        Ok(QueryHits {
            ids,
            documents,
            metadatas,
            distances,
        })
    }
}

/// Rewrites a field-equality map into Chroma's required filter form:
/// `{"$and": [{field: {"$eq": value}}, …]}`. Empty filters are omitted.
pub(crate) fn format_filter(filter: &Metadata) -> Option<Value> {
    if filter.is_empty() {
        return None;
    }
    let clauses: Vec<Value> = filter
        .iter()
        .map(|(k, v)| json!({ k: { "$eq": v } }))
        .collect();
    Some(json!({ "$and": clauses }))
}

/// Pads with ε or truncates a vector to the expected dimension.
pub(crate) fn adjust_dimension(mut v: Vec<f32>, dim: usize) -> Vec<f32> {
    if v.len() == dim {
        return v;
    }
    warn!(
        "query embedding dimension mismatch: expected {dim}, got {}; adjusting",
        v.len()
    );
    v.resize(dim, EPSILON);
    v
}

#[derive(serde::Deserialize)]
struct GetResponse {
    #[serde(default)]
    ids: Vec<String>,
    #[serde(default)]
    documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Option<Vec<Option<Metadata>>>,
}

#[derive(serde::Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_rewrite_uses_eq_joined_with_and() {
        let mut filter = Metadata::new();
        filter.insert("repo_key".into(), "a/b".into());
        filter.insert("language".into(), "go".into());

        let clause = format_filter(&filter).expect("non-empty filter");
        let and = clause.get("$and").and_then(Value::as_array).expect("$and");
        assert_eq!(and.len(), 2);
        assert!(and
            .iter()
            .any(|c| c.get("repo_key").and_then(|m| m.get("$eq")) == Some(&Value::from("a/b"))));
        assert!(and
            .iter()
            .any(|c| c.get("language").and_then(|m| m.get("$eq")) == Some(&Value::from("go"))));
    }

    #[test]
    fn empty_filter_is_omitted() {
        assert!(format_filter(&Metadata::new()).is_none());
    }

    #[test]
    fn dimension_adjustment_pads_and_truncates() {
        let padded = adjust_dimension(vec![1.0, 2.0], 4);
        assert_eq!(padded.len(), 4);
        assert_eq!(&padded[..2], &[1.0, 2.0]);
        assert!(padded[2] > 0.0 && padded[2] < 1e-4);

        let truncated = adjust_dimension(vec![1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(truncated, vec![1.0, 2.0]);

        let unchanged = adjust_dimension(vec![1.0, 2.0], 2);
        assert_eq!(unchanged, vec![1.0, 2.0]);
    }
}
