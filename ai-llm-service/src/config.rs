//! LLM provider configuration, loaded once at startup.

use std::{env, fmt};

use crate::errors::{LlmError, LlmResult};

/// Sampling parameters shared by every provider branch.
#[derive(Clone, Copy, Debug)]
pub struct Sampling {
    pub temperature: f32,
    pub top_p: f32,
    /// 0 disables the cap (the field is omitted from requests).
    pub max_tokens: u32,
}

/// Immutable provider-chain configuration.
#[derive(Clone)]
pub struct LlmConfig {
    // LLM proxy shell shared by the Claude and Deepseek branches.
    pub llm_proxy_endpoint: String,
    pub llm_proxy_api_key: String,

    // Claude branch.
    pub claude_model_name: String,
    pub claude_max_tokens: u32,

    // Deepseek branch.
    pub deepseek_model_name: String,

    // Direct OpenAI-compatible endpoint.
    pub direct_endpoint: String,
    pub direct_model_id: String,
    pub direct_api_key: String,
    pub direct_provider_type: String,

    // OpenAI / Azure-OpenAI.
    pub openai_api_key: String,
    pub openai_endpoint: String,
    pub model: String,
    pub azure_api_version: String,
    pub azure_deployment: String,

    pub sampling: Sampling,
}

impl LlmConfig {
    /// Loads the chain configuration from the environment.
    ///
    /// Defaults follow the upstream conventions: `gpt-4o-mini`, the public
    /// OpenAI endpoint, temperature/top_p of 1, a 4000-token Claude cap.
    pub fn from_env() -> LlmResult<Self> {
        let cfg = Self {
            llm_proxy_endpoint: env::var("LLM_PROXY_ENDPOINT").unwrap_or_default(),
            llm_proxy_api_key: env::var("LLM_PROXY_API_KEY").unwrap_or_default(),
            claude_model_name: env::var("CLAUDE_MODEL_NAME").unwrap_or_default(),
            claude_max_tokens: parse_or("CLAUDE_MAX_TOKENS", 4000),
            deepseek_model_name: env::var("DEEPSEEK_MODEL_NAME").unwrap_or_default(),
            direct_endpoint: env::var("DIRECT_LLM_ENDPOINT").unwrap_or_default(),
            direct_model_id: env::var("DIRECT_LLM_MODEL_ID").unwrap_or_default(),
            direct_api_key: env::var("DIRECT_LLM_API_KEY").unwrap_or_default(),
            direct_provider_type: env::var("DIRECT_LLM_PROVIDER_TYPE").unwrap_or_default(),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_endpoint: env_or("OPENAI_API_ENDPOINT", "https://api.openai.com/v1"),
            model: env_or("MODEL", "gpt-4o-mini"),
            azure_api_version: env::var("AZURE_API_VERSION").unwrap_or_default(),
            azure_deployment: env::var("AZURE_DEPLOYMENT").unwrap_or_default(),
            sampling: Sampling {
                temperature: parse_or("temperature", 1.0),
                top_p: parse_or("top_p", 1.0),
                max_tokens: parse_or("max_tokens", 0),
            },
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Requires at least one enabled provider branch.
    pub fn validate(&self) -> LlmResult<()> {
        if self.claude_enabled()
            || self.deepseek_enabled()
            || self.direct_enabled()
            || self.openai_enabled()
        {
            Ok(())
        } else {
            Err(LlmError::NoProviders)
        }
    }

    pub fn claude_enabled(&self) -> bool {
        !self.llm_proxy_endpoint.is_empty()
            && !self.llm_proxy_api_key.is_empty()
            && !self.claude_model_name.is_empty()
    }

    pub fn deepseek_enabled(&self) -> bool {
        !self.llm_proxy_endpoint.is_empty()
            && !self.llm_proxy_api_key.is_empty()
            && !self.deepseek_model_name.is_empty()
    }

    pub fn direct_enabled(&self) -> bool {
        !self.direct_endpoint.is_empty()
            && !self.direct_model_id.is_empty()
            && !self.direct_api_key.is_empty()
    }

    pub fn openai_enabled(&self) -> bool {
        !self.openai_api_key.is_empty()
    }

    pub fn is_azure(&self) -> bool {
        !self.azure_api_version.is_empty() && !self.azure_deployment.is_empty()
    }

    /// Token budget used when sizing patch chunks: the Claude cap when that
    /// branch is enabled, the upstream default of 4000 otherwise.
    pub fn chunk_max_tokens(&self) -> usize {
        if self.claude_enabled() {
            self.claude_max_tokens as usize
        } else {
            4000
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("llm_proxy_endpoint", &self.llm_proxy_endpoint)
            .field("claude_model_name", &self.claude_model_name)
            .field("claude_max_tokens", &self.claude_max_tokens)
            .field("deepseek_model_name", &self.deepseek_model_name)
            .field("direct_endpoint", &self.direct_endpoint)
            .field("direct_model_id", &self.direct_model_id)
            .field("openai_endpoint", &self.openai_endpoint)
            .field("model", &self.model)
            .field("azure_deployment", &self.azure_deployment)
            .field("sampling", &self.sampling)
            .field("llm_proxy_api_key", &"***")
            .field("direct_api_key", &"***")
            .field("openai_api_key", &"***")
            .finish()
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
