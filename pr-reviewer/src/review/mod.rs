//! Review core: chunking, dispatch, verdict handling and rendering.
//!
//! [`review_patch`] is the per-file entry: it splits the (possibly
//! enriched) patch into token-bounded chunks, fans them out through the
//! provider chain, and merges the per-chunk verdicts into one result.

pub mod chunk;
pub mod comment;
pub mod dispatch;
pub mod filter;
pub mod merge;
pub mod prompt;
pub mod verdict;

use std::sync::Arc;

use ai_llm_service::ProviderChain;
use tracing::{debug, warn};

use chunk::split_patch;
use prompt::PromptConfig;
use verdict::Verdict;

/// Reviews one patch through the chain and merges the chunk verdicts.
///
/// Never fails: chunks that exhaust the chain and their retries contribute
/// neutral verdicts, and an empty patch merges to the neutral result.
pub async fn review_patch(
    chain: Arc<ProviderChain>,
    prompt_cfg: &PromptConfig,
    patch: &str,
    max_chunk_tokens: usize,
) -> Verdict {
    let chunks = split_patch(patch, max_chunk_tokens);
    debug!(
        "reviewing patch of {} bytes as {} chunk(s)",
        patch.len(),
        chunks.len()
    );

    let prompt_cfg = prompt_cfg.clone();
    let language = prompt_cfg.language;
    let review_one = move |chunk: chunk::Chunk| {
        let chain = chain.clone();
        let prompt_cfg = prompt_cfg.clone();
        async move {
            let prompt = prompt::build_chunk_prompt(&prompt_cfg, &chunk);
            let content = chain.generate(&prompt).await?;
            Ok(verdict::parse_verdict(&content).unwrap_or_else(|| {
                warn!(
                    "unparseable model response for chunk {}/{}; raw body: {content}",
                    chunk.index, chunk.total
                );
                Verdict::neutral()
            }))
        }
    };

    let verdicts = dispatch::review_chunks(&chunks, review_one).await;
    merge::merge_verdicts(&verdicts, language)
}
