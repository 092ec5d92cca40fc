//! OpenAI / Azure-OpenAI chat-completion service.
//!
//! Plain OpenAI uses `{endpoint}/chat/completions` with bearer auth. Azure
//! deployments use the deployment-scoped URL with an `api-version` query
//! parameter and the `api-key` header instead of `Authorization`.

use std::time::Duration;

use reqwest::header;
use tracing::{debug, instrument};

use crate::config::{LlmConfig, Sampling};
use crate::errors::{LlmError, LlmResult};
use crate::services::{bearer_client, require_http_endpoint, send_chat, ChatRequest};

#[derive(Debug, Clone)]
pub struct OpenAiService {
    http: reqwest::Client,
    url_chat: String,
    model: String,
    sampling: Sampling,
}

impl OpenAiService {
    /// Builds the service from the OpenAI/Azure section of the config.
    pub fn from_config(cfg: &LlmConfig) -> LlmResult<Self> {
        if cfg.openai_api_key.is_empty() {
            return Err(LlmError::MissingApiKey("openai"));
        }
        let base = require_http_endpoint(&cfg.openai_endpoint)?;

        if cfg.is_azure() {
            // Azure authenticates with an `api-key` header and routes the
            // model through the deployment name in the URL.
            let mut headers = header::HeaderMap::new();
            headers.insert(
                "api-key",
                header::HeaderValue::from_str(&cfg.openai_api_key)
                    .map_err(|e| LlmError::Decode(format!("invalid API key header: {e}")))?,
            );
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .pool_max_idle_per_host(10)
                .default_headers(headers)
                .build()?;
            Ok(Self {
                http,
                url_chat: format!(
                    "{base}/openai/deployments/{}/chat/completions?api-version={}",
                    cfg.azure_deployment, cfg.azure_api_version
                ),
                model: cfg.azure_deployment.clone(),
                sampling: cfg.sampling,
            })
        } else {
            Ok(Self {
                http: bearer_client(&cfg.openai_api_key)?,
                url_chat: format!("{base}/chat/completions"),
                model: cfg.model.clone(),
                sampling: cfg.sampling,
            })
        }
    }

    /// Performs a non-streaming chat completion.
    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn generate(&self, prompt: &str) -> LlmResult<String> {
        let body = ChatRequest::single_user(&self.model, prompt, self.sampling, None);
        debug!("POST {}", self.url_chat);
        send_chat(&self.http, &self.url_chat, &body).await
    }
}
