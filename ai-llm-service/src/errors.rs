//! Errors produced by the LLM service layer.

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    /// No provider branch is configured.
    #[error("either direct LLM, LLM proxy, or OpenAI API configuration is required")]
    NoProviders,

    /// API key is missing for an enabled provider.
    #[error("missing API key for provider {0}")]
    MissingApiKey(&'static str),

    /// Invalid endpoint (empty or missing http/https).
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Transport/HTTP client error.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-successful HTTP status from upstream.
    #[error("unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    /// Unexpected/invalid JSON response.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The completion returned no choices.
    #[error("empty response: no choices returned")]
    EmptyChoices,

    /// Every provider in the chain failed for this request.
    #[error("all providers in the chain failed")]
    AllProvidersFailed,
}
