//! Concrete chat-completion services and their shared wire payloads.
//!
//! All three services speak the OpenAI chat-completions shape: one user
//! message, `response_format` pinned to `json_object`, sampling knobs from
//! the shared configuration, `Authorization: Bearer` (or `api-key` on
//! Azure). Success requires HTTP 200 and at least one choice.

pub mod direct_service;
pub mod open_ai_service;
pub mod proxy_service;

pub use direct_service::DirectService;
pub use open_ai_service::OpenAiService;
pub use proxy_service::ProxyService;

use std::time::Duration;

use reqwest::header;
use serde::{Deserialize, Serialize};

use crate::config::Sampling;
use crate::errors::{LlmError, LlmResult};

pub(crate) const CHAT_TIMEOUT: Duration = Duration::from_secs(60);

/// Builds the shared HTTP client with bearer auth installed as a default
/// header so the key never travels through call sites.
pub(crate) fn bearer_client(api_key: &str) -> LlmResult<reqwest::Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| LlmError::Decode(format!("invalid API key header: {e}")))?,
    );
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    Ok(reqwest::Client::builder()
        .timeout(CHAT_TIMEOUT)
        .pool_max_idle_per_host(10)
        .default_headers(headers)
        .build()?)
}

pub(crate) fn require_http_endpoint(endpoint: &str) -> LlmResult<String> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() || !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(LlmError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Chat-completions request (non-streaming, strict JSON output).
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f32,
    pub top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
}

impl<'a> ChatRequest<'a> {
    /// One user message with the shared sampling knobs. A `max_tokens`
    /// override takes precedence over the configured cap; 0 omits the field.
    pub fn single_user(
        model: &'a str,
        prompt: &'a str,
        sampling: Sampling,
        max_tokens_override: Option<u32>,
    ) -> Self {
        let max_tokens = match max_tokens_override {
            Some(v) => Some(v),
            None if sampling.max_tokens > 0 => Some(sampling.max_tokens),
            None => None,
        };
        Self {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatMessageOut,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatMessageOut {
    #[serde(default)]
    pub content: Option<String>,
}

/// POSTs a chat request and extracts the first choice's content.
pub(crate) async fn send_chat(
    http: &reqwest::Client,
    url: &str,
    body: &ChatRequest<'_>,
) -> LlmResult<String> {
    let resp = http.post(url).json(body).send().await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let url = url.to_string();
        let text = resp.text().await.unwrap_or_default();
        let snippet = text.chars().take(240).collect::<String>();
        return Err(LlmError::HttpStatus {
            status,
            url,
            snippet,
        });
    }

    let out: ChatResponse = resp.json().await.map_err(|e| {
        LlmError::Decode(format!(
            "serde error: {e}; expected `choices[0].message.content`"
        ))
    })?;

    out.choices
        .into_iter()
        .find_map(|c| c.message.content)
        .ok_or(LlmError::EmptyChoices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_omits_zero_max_tokens() {
        let sampling = Sampling {
            temperature: 0.7,
            top_p: 1.0,
            max_tokens: 0,
        };
        let req = ChatRequest::single_user("m", "p", sampling, None);
        let json = serde_json::to_value(&req).expect("serialize");
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn chat_request_override_beats_configured_cap() {
        let sampling = Sampling {
            temperature: 1.0,
            top_p: 1.0,
            max_tokens: 256,
        };
        let req = ChatRequest::single_user("m", "p", sampling, Some(4000));
        assert_eq!(req.max_tokens, Some(4000));

        let req = ChatRequest::single_user("m", "p", sampling, None);
        assert_eq!(req.max_tokens, Some(256));
    }

    #[test]
    fn endpoints_must_be_http() {
        assert!(require_http_endpoint("ftp://nope").is_err());
        assert!(require_http_endpoint("").is_err());
        assert_eq!(
            require_http_endpoint("https://api.example.com/v1/").expect("valid"),
            "https://api.example.com/v1"
        );
    }
}
