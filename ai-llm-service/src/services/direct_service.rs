//! Client for a directly-configured OpenAI-compatible endpoint.

use tracing::{debug, instrument};

use crate::config::Sampling;
use crate::errors::LlmResult;
use crate::services::{bearer_client, require_http_endpoint, send_chat, ChatRequest};

#[derive(Debug, Clone)]
pub struct DirectService {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    sampling: Sampling,
}

impl DirectService {
    pub fn new(endpoint: &str, api_key: &str, model: &str, sampling: Sampling) -> LlmResult<Self> {
        Ok(Self {
            http: bearer_client(api_key)?,
            endpoint: require_http_endpoint(endpoint)?,
            model: model.to_string(),
            sampling,
        })
    }

    /// Performs a non-streaming chat completion against the endpoint.
    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn generate(&self, prompt: &str) -> LlmResult<String> {
        let body = ChatRequest::single_user(&self.model, prompt, self.sampling, None);
        debug!("POST {}", self.endpoint);
        send_chat(&self.http, &self.endpoint, &body).await
    }
}
