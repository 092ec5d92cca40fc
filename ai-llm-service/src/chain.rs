//! Provider-failover chain (enum-dispatch, strict order).

use tracing::{info, warn};

use crate::config::LlmConfig;
use crate::errors::{LlmError, LlmResult};
use crate::services::{DirectService, OpenAiService, ProxyService};

/// One enabled provider branch.
#[derive(Debug, Clone)]
pub enum ChatProvider {
    Claude(ProxyService),
    Deepseek(ProxyService),
    Direct(DirectService),
    OpenAi(OpenAiService),
}

impl ChatProvider {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Claude(_) => "claude",
            Self::Deepseek(_) => "deepseek",
            Self::Direct(_) => "direct",
            Self::OpenAi(_) => "openai",
        }
    }

    async fn generate(&self, prompt: &str) -> LlmResult<String> {
        match self {
            Self::Claude(s) | Self::Deepseek(s) => s.generate(prompt).await,
            Self::Direct(s) => s.generate(prompt).await,
            Self::OpenAi(s) => s.generate(prompt).await,
        }
    }
}

/// Ordered failover chain over the enabled providers.
///
/// The order is fixed: Claude proxy, Deepseek proxy, direct endpoint,
/// OpenAI/Azure. Disabled branches are never constructed.
#[derive(Debug, Clone)]
pub struct ProviderChain {
    providers: Vec<ChatProvider>,
}

impl ProviderChain {
    /// Builds the chain from configuration. Fails when no branch is enabled.
    pub fn from_config(cfg: &LlmConfig) -> LlmResult<Self> {
        let mut providers = Vec::new();

        if cfg.claude_enabled() {
            providers.push(ChatProvider::Claude(ProxyService::new(
                &cfg.llm_proxy_endpoint,
                &cfg.llm_proxy_api_key,
                &cfg.claude_model_name,
                cfg.sampling,
                Some(cfg.claude_max_tokens),
            )?));
        }
        if cfg.deepseek_enabled() {
            providers.push(ChatProvider::Deepseek(ProxyService::new(
                &cfg.llm_proxy_endpoint,
                &cfg.llm_proxy_api_key,
                &cfg.deepseek_model_name,
                cfg.sampling,
                None,
            )?));
        }
        if cfg.direct_enabled() {
            providers.push(ChatProvider::Direct(DirectService::new(
                &cfg.direct_endpoint,
                &cfg.direct_api_key,
                &cfg.direct_model_id,
                cfg.sampling,
            )?));
        }
        if cfg.openai_enabled() {
            providers.push(ChatProvider::OpenAi(OpenAiService::from_config(cfg)?));
        }

        if providers.is_empty() {
            return Err(LlmError::NoProviders);
        }
        info!(
            "provider chain: {}",
            providers
                .iter()
                .map(ChatProvider::name)
                .collect::<Vec<_>>()
                .join(" -> ")
        );
        Ok(Self { providers })
    }

    /// Names of the enabled providers in failover order.
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(ChatProvider::name).collect()
    }

    /// Runs the prompt through the chain; the first success wins.
    ///
    /// Each provider failure logs a warning and advances to the next branch.
    /// When every branch fails the caller receives
    /// [`LlmError::AllProvidersFailed`] and decides on retry or fallback.
    pub async fn generate(&self, prompt: &str) -> LlmResult<String> {
        for provider in &self.providers {
            match provider.generate(prompt).await {
                Ok(content) => {
                    info!("provider {} answered", provider.name());
                    return Ok(content);
                }
                Err(e) => {
                    warn!("provider {} failed: {e}; trying next", provider.name());
                }
            }
        }
        Err(LlmError::AllProvidersFailed)
    }
}
