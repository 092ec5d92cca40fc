//! Error hierarchy for the vector store crate.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient alias for store-wide results.
pub type StoreResult<T> = Result<T, StoreError>;

/// Root error type for snippet storage and embedding operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid or incomplete configuration.
    #[error("store config error: {0}")]
    Config(String),

    /// Transport/HTTP client failure.
    #[error("store transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-successful HTTP status from the vector database.
    #[error("unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    /// Unexpected or invalid response shape.
    #[error("failed to decode store response: {0}")]
    Decode(String),

    /// Filesystem failure in the local backend.
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("store serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Snippet or collection does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation not supported by the active backend.
    #[error("unsupported store operation: {0}")]
    Unsupported(&'static str),
}

impl StoreError {
    /// Builds an [`StoreError::HttpStatus`] from a response, consuming the body
    /// for a short diagnostic snippet.
    pub async fn from_response(resp: reqwest::Response) -> Self {
        let status = resp.status();
        let url = resp.url().to_string();
        let text = resp.text().await.unwrap_or_default();
        let snippet = text.chars().take(240).collect::<String>();
        StoreError::HttpStatus {
            status,
            url,
            snippet,
        }
    }
}
