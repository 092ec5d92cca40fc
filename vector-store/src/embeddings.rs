//! Embedding services behind one enum-dispatched client.
//!
//! Three sources are supported:
//! - `openai`: the OpenAI `/v1/embeddings` endpoint;
//! - `llm_proxy`: an OpenAI-compatible proxy, endpoint normalized to end in
//!   `/embeddings`, model formatted as `provider/model`;
//! - `simple`: a deterministic hashed bag-of-words vector for development,
//!   no network involved.

use std::time::Duration;

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EmbeddingConfig, VectorKind};
use crate::errors::{StoreError, StoreResult};

const EMBED_TIMEOUT: Duration = Duration::from_secs(30);

/// Dimension of the development-mode hashed vectors.
pub const SIMPLE_EMBEDDING_DIM: usize = 256;

/// Enum-dispatched embedding client.
#[derive(Debug, Clone)]
pub enum EmbeddingClient {
    OpenAi(OpenAiEmbedder),
    LlmProxy(ProxyEmbedder),
    Simple(SimpleEmbedder),
}

impl EmbeddingClient {
    /// Constructs a concrete embedder from generic config.
    pub fn from_config(cfg: &EmbeddingConfig) -> StoreResult<Self> {
        Ok(match cfg.kind {
            VectorKind::OpenAi => Self::OpenAi(OpenAiEmbedder::new(
                &cfg.openai_endpoint,
                &cfg.openai_api_key,
                &cfg.openai_model,
            )?),
            VectorKind::LlmProxy => Self::LlmProxy(ProxyEmbedder::new(
                &cfg.proxy_endpoint,
                &cfg.proxy_api_key,
                &cfg.proxy_model,
                &cfg.proxy_provider,
            )?),
            VectorKind::Simple => Self::Simple(SimpleEmbedder::default()),
        })
    }

    /// Embeds a code fragment, tagging the input with its language.
    pub async fn embed_code(&self, language: &str, content: &str) -> StoreResult<Vec<f32>> {
        let input = format!("Language: {language}\n\n{content}");
        self.embed(&input).await
    }

    /// Embeds a plain query string.
    pub async fn embed_query(&self, query: &str) -> StoreResult<Vec<f32>> {
        self.embed(query).await
    }

    async fn embed(&self, input: &str) -> StoreResult<Vec<f32>> {
        match self {
            Self::OpenAi(c) => c.embed(input).await,
            Self::LlmProxy(c) => c.embed(input).await,
            Self::Simple(c) => Ok(c.embed(input)),
        }
    }
}

/// Thin client for the OpenAI embeddings endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    http: reqwest::Client,
    url: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> StoreResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| StoreError::Config(format!("invalid API key header: {e}")))?,
        );
        let http = reqwest::Client::builder()
            .timeout(EMBED_TIMEOUT)
            .pool_max_idle_per_host(10)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http,
            url: format!("{}/embeddings", endpoint.trim_end_matches('/')),
            model: model.to_string(),
        })
    }

    async fn embed(&self, input: &str) -> StoreResult<Vec<f32>> {
        debug!("POST {}", self.url);
        post_embeddings(&self.http, &self.url, &self.model, input).await
    }
}

/// Embedding client for an OpenAI-compatible LLM proxy.
#[derive(Debug, Clone)]
pub struct ProxyEmbedder {
    http: reqwest::Client,
    url: String,
    model: String,
}

impl ProxyEmbedder {
    pub fn new(endpoint: &str, api_key: &str, model: &str, provider: &str) -> StoreResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| StoreError::Config(format!("invalid API key header: {e}")))?,
        );
        let http = reqwest::Client::builder()
            .timeout(EMBED_TIMEOUT)
            .pool_max_idle_per_host(10)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http,
            url: normalize_embedding_endpoint(endpoint),
            model: format_model(model, provider),
        })
    }

    async fn embed(&self, input: &str) -> StoreResult<Vec<f32>> {
        debug!("POST {} (model: {})", self.url, self.model);
        post_embeddings(&self.http, &self.url, &self.model, input).await
    }
}

/// Deterministic hashed bag-of-words embedder for development mode.
///
/// Identifier-ish tokens are hashed (FNV-1a) into a fixed number of buckets
/// and the resulting vector is L2-normalized, so the same input always maps
/// to the same vector across runs and processes.
#[derive(Debug, Clone)]
pub struct SimpleEmbedder {
    dim: usize,
}

impl Default for SimpleEmbedder {
    fn default() -> Self {
        Self {
            dim: SIMPLE_EMBEDDING_DIM,
        }
    }
}

impl SimpleEmbedder {
    pub fn embed(&self, input: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in input
            .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
        {
            let bucket = (fnv1a(token.as_bytes()) as usize) % self.dim;
            v[bucket] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

/// Ensures the proxy endpoint ends in `/embeddings`.
fn normalize_embedding_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim_end_matches('/');
    if trimmed.ends_with("/embeddings") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/embeddings")
    }
}

/// Prefixes `provider/` onto bare model names.
fn format_model(model: &str, provider: &str) -> String {
    if !provider.is_empty() && !model.contains('/') {
        format!("{provider}/{model}")
    } else {
        model.to_string()
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

async fn post_embeddings(
    http: &reqwest::Client,
    url: &str,
    model: &str,
    input: &str,
) -> StoreResult<Vec<f32>> {
    let body = EmbeddingsRequest {
        model,
        input: vec![input],
    };
    let resp = http.post(url).json(&body).send().await?;
    if !resp.status().is_success() {
        return Err(StoreError::from_response(resp).await);
    }

    let out: EmbeddingsResponse = resp
        .json()
        .await
        .map_err(|e| StoreError::Decode(format!("serde error: {e}; expected `data[0].embedding`")))?;

    let first = out
        .data
        .into_iter()
        .next()
        .ok_or_else(|| StoreError::Decode("empty `data` in embeddings response".into()))?;
    if first.embedding.is_empty() {
        return Err(StoreError::Decode("empty embedding vector in response".into()));
    }
    Ok(first.embedding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_embedder_is_deterministic_and_normalized() {
        let e = SimpleEmbedder::default();
        let a = e.embed("fn parse_config(input: &str) -> Config");
        let b = e.embed("fn parse_config(input: &str) -> Config");
        assert_eq!(a, b);
        assert_eq!(a.len(), SIMPLE_EMBEDDING_DIM);

        let norm = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);

        let c = e.embed("completely different text about databases");
        assert_ne!(a, c);
    }

    #[test]
    fn endpoint_normalization_appends_embeddings_once() {
        assert_eq!(
            normalize_embedding_endpoint("https://proxy.local/v1"),
            "https://proxy.local/v1/embeddings"
        );
        assert_eq!(
            normalize_embedding_endpoint("https://proxy.local/v1/embeddings"),
            "https://proxy.local/v1/embeddings"
        );
        assert_eq!(
            normalize_embedding_endpoint("https://proxy.local/v1/"),
            "https://proxy.local/v1/embeddings"
        );
    }

    #[test]
    fn model_formatting_prefixes_provider() {
        assert_eq!(format_model("embed-v3", "cohere"), "cohere/embed-v3");
        assert_eq!(format_model("azure/embed-v3", "cohere"), "azure/embed-v3");
        assert_eq!(format_model("embed-v3", ""), "embed-v3");
    }
}
