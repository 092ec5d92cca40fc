//! Client for the shared LLM-proxy endpoint.
//!
//! The proxy speaks the OpenAI chat-completions shape and multiplexes
//! models behind one URL, so the Claude and Deepseek branches are two
//! instances of this service with different model names. The Claude branch
//! always sends its configured token cap.

use tracing::{debug, instrument};

use crate::config::Sampling;
use crate::errors::LlmResult;
use crate::services::{bearer_client, require_http_endpoint, send_chat, ChatRequest};

#[derive(Debug, Clone)]
pub struct ProxyService {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    sampling: Sampling,
    /// Hard token cap sent with every request (Claude branch); `None` falls
    /// back to the sampling default.
    max_tokens: Option<u32>,
}

impl ProxyService {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        model: &str,
        sampling: Sampling,
        max_tokens: Option<u32>,
    ) -> LlmResult<Self> {
        Ok(Self {
            http: bearer_client(api_key)?,
            endpoint: require_http_endpoint(endpoint)?,
            model: model.to_string(),
            sampling,
            max_tokens,
        })
    }

    /// Performs a non-streaming chat completion against the proxy.
    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn generate(&self, prompt: &str) -> LlmResult<String> {
        let body = ChatRequest::single_user(&self.model, prompt, self.sampling, self.max_tokens);
        debug!("POST {}", self.endpoint);
        send_chat(&self.http, &self.endpoint, &body).await
    }
}
