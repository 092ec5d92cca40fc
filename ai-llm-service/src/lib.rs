//! Chat-completion clients for the review provider chain.
//!
//! The crate exposes thin OpenAI-compatible clients and composes them into a
//! strict-order failover chain:
//!
//! 1. Claude via the LLM-proxy endpoint (when a Claude model is configured)
//! 2. Deepseek via the LLM-proxy endpoint
//! 3. A direct OpenAI-compatible endpoint
//! 4. OpenAI / Azure-OpenAI
//!
//! Disabled providers are skipped; any failure logs a warning and advances
//! to the next provider. No HTTP retries happen here: retry policy belongs
//! to the dispatcher that owns the chunk.

pub mod chain;
pub mod config;
pub mod errors;
pub mod services;

pub use chain::{ChatProvider, ProviderChain};
pub use config::LlmConfig;
pub use errors::{LlmError, LlmResult};
