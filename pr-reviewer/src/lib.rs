//! Public entry for the pull-request review pipeline.
//!
//! Single high-level function to run the whole pipeline for one webhook
//! event:
//!
//! 1) **Gate** — normalized action must be opened/synchronized; the PR must
//!    be open and unlocked; a configured target label must be present.
//! 2) **Compare** — fetch changed files and the commit range; synchronized
//!    events with ≥2 commits narrow to the latest-commit diff.
//! 3) **Filter** — include/ignore glob sets, exact ignore list, status and
//!    patch-size gates.
//! 4) **Context** — when indexing is enabled, refresh the repository index
//!    at the head commit and enrich each patch with retrieved context.
//!    Retrieval failures degrade to the raw patch, never abort the review.
//! 5) **Review** — per file: chunk, fan out through the provider chain,
//!    retry failed chunks, merge verdicts, render the localized comment.
//! 6) **Post** — one review per invocation, anchored at the latest commit.
//!
//! The pipeline uses `tracing` for step logging and avoids `async-trait`
//! and heap trait objects; provider and LLM dispatch are enum-based.

pub mod errors;
pub mod git_providers;
pub mod review;

use std::sync::Arc;
use std::time::Instant;

use ai_llm_service::ProviderChain;
use code_indexer::{ChangedFile, IndexManager, RepoInfo};
use tracing::{debug, info, warn};

use errors::MrResult;
use git_providers::{
    Commit, CommitFile, PrAction, PrState, ProviderClient, ProviderConfig, PullRequestRef,
    ReviewComment,
};
use review::comment::{build_file_comment, build_review_body, position_for, FileReview};
use review::filter::{filter_files, FilterConfig};
use review::prompt::PromptConfig;

/// Normalized webhook event driving one pipeline invocation.
#[derive(Debug, Clone)]
pub struct PrEvent {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub action: PrAction,
    /// May be empty (some vendors omit it); the adapter's diff refs fill in.
    pub base_sha: String,
    pub head_sha: String,
}

/// Pipeline configuration derived from the application config.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    pub prompt: PromptConfig,
    /// When set, PRs lacking this label are skipped.
    pub target_label: Option<String>,
    pub filter: FilterConfig,
    /// Token budget per chunk.
    pub max_chunk_tokens: usize,
}

/// What the pipeline did for this event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Logged-only skip (filters, labels, closed PR, uninteresting action).
    Skipped(&'static str),
    /// A review was posted.
    Posted { files_reviewed: usize, lgtm: bool },
}

/// Runs the full review pipeline for one event and posts the review.
pub async fn run_review(
    provider_cfg: ProviderConfig,
    event: PrEvent,
    cfg: ReviewConfig,
    chain: Arc<ProviderChain>,
    index: Option<Arc<IndexManager>>,
) -> MrResult<ReviewOutcome> {
    let t0 = Instant::now();

    if !matches!(event.action, PrAction::Opened | PrAction::Synchronized) {
        info!("skipping event with action {:?}", event.action);
        return Ok(ReviewOutcome::Skipped("action"));
    }

    debug!("init provider client");
    let client = ProviderClient::from_config(provider_cfg)?;

    debug!(
        "fetch PR metadata for {}/{}#{}",
        event.owner, event.repo, event.number
    );
    let pr = {
        let meta = client
            .get_pull_request(&event.owner, &event.repo, event.number)
            .await?;
        PullRequestRef {
            action: event.action,
            ..meta
        }
    };

    if pr.state == PrState::Closed || pr.locked {
        info!("pull request is closed or locked, skipping");
        return Ok(ReviewOutcome::Skipped("closed or locked"));
    }
    if let Some(label) = &cfg.target_label {
        if !pr.labels.iter().any(|l| l == label) {
            info!("target label {label:?} not attached, skipping");
            return Ok(ReviewOutcome::Skipped("target label"));
        }
    }

    let base_sha = non_empty_or(&event.base_sha, &pr.base_sha);
    let head_sha = non_empty_or(&event.head_sha, &pr.head_sha);

    debug!("compare commits {base_sha}..{head_sha}");
    let (mut files, commits) = client
        .compare_commits(&event.owner, &event.repo, &base_sha, &head_sha)
        .await?;

    // Synchronized pushes review only what the latest commit changed.
    if event.action == PrAction::Synchronized && commits.len() >= 2 {
        let last_base = &commits[commits.len() - 2].sha;
        let last_head = &commits[commits.len() - 1].sha;
        debug!("narrowing to latest commit diff {last_base}..{last_head}");
        let (latest_files, _) = client
            .compare_commits(&event.owner, &event.repo, last_base, last_head)
            .await?;
        files = latest_files;
    }

    let filtered = filter_files(&files, &cfg.filter);
    if filtered.is_empty() {
        info!("no files to review after filtering");
        return Ok(ReviewOutcome::Skipped("filters"));
    }
    debug!("{} of {} files retained", filtered.len(), files.len());

    // Refresh the index at the head commit before querying context.
    let indexer = index.map(|manager| manager.get_indexer(&event.owner, &event.repo));
    if let Some(idxr) = &indexer {
        if let Err(e) = idxr.index_repository(None, &head_sha).await {
            warn!(
                "failed to index {}/{}: {e}; continuing with partial or no context",
                event.owner, event.repo
            );
        }
    }

    let mut comments: Vec<ReviewComment> = Vec::with_capacity(filtered.len());
    let mut file_reviews: Vec<FileReview> = Vec::with_capacity(filtered.len());
    let language = cfg.prompt.language;

    for file in filtered {
        let enriched = match &indexer {
            Some(idxr) => {
                enrich_file(idxr, file, &event, &head_sha)
                    .await
                    .unwrap_or_else(|| file.patch.clone())
            }
            None => file.patch.clone(),
        };

        let verdict =
            review::review_patch(chain.clone(), &cfg.prompt, &enriched, cfg.max_chunk_tokens)
                .await;
        debug!(
            "{} reviewed: lgtm={}, comment bytes={}",
            file.path,
            verdict.lgtm,
            verdict.review_comment.len()
        );

        let body = build_file_comment(&verdict, language);
        comments.push(ReviewComment {
            path: file.path.clone(),
            body,
            position: position_for(&file.patch),
        });
        file_reviews.push(FileReview {
            path: file.path.clone(),
            lgtm: verdict.lgtm || verdict.is_empty(),
        });
    }

    let body = build_review_body(&file_reviews, language);
    let commit_id = commits
        .last()
        .map(|c: &Commit| c.sha.clone())
        .unwrap_or_else(|| head_sha.clone());

    debug!("posting review anchored at {commit_id}");
    client
        .create_review(
            &event.owner,
            &event.repo,
            event.number,
            &commit_id,
            &comments,
            &body,
        )
        .await?;

    let lgtm = file_reviews.iter().all(|r| r.lgtm);
    info!(
        "reviewed {}/{}#{}: {} files in {:?}",
        event.owner,
        event.repo,
        event.number,
        file_reviews.len(),
        t0.elapsed()
    );
    Ok(ReviewOutcome::Posted {
        files_reviewed: file_reviews.len(),
        lgtm,
    })
}

/// Queries context for one file and enriches its patch. Returns `None` when
/// no usable context exists so the caller falls back to the raw patch.
async fn enrich_file(
    idxr: &code_indexer::RepoIndexer,
    file: &CommitFile,
    event: &PrEvent,
    head_sha: &str,
) -> Option<String> {
    let repo_info = RepoInfo {
        owner: event.owner.clone(),
        name: event.repo.clone(),
        language: code_indexer::walk::file_language(&file.path).to_string(),
        branch: String::new(),
        head_sha: head_sha.to_string(),
    };
    let changed = vec![ChangedFile {
        path: file.path.clone(),
        patch: file.patch.clone(),
    }];

    let contexts = idxr.query_context(&changed, &repo_info).await;
    let context = contexts.get(&file.path)?;
    if context.is_empty() {
        debug!("no relevant code context found for {}", file.path);
        return None;
    }
    debug!(
        "enriching {} with {} imports, {} definitions, {} similar snippets",
        file.path,
        context.imports.len(),
        context.definitions.len(),
        context.similar.len()
    );
    Some(code_indexer::enrich_patch_with_context(&file.patch, context))
}

fn non_empty_or(primary: &str, fallback: &str) -> String {
    if primary.is_empty() {
        fallback.to_string()
    } else {
        primary.to_string()
    }
}

// -----------------------------------------------------------------------------
// Convenience re-exports for downstream users
// -----------------------------------------------------------------------------

pub use errors::Error;
pub use git_providers::{ProviderKind, ProviderConfig as ReviewerProviderConfig};
pub use review::prompt::{Language, DEFAULT_PROMPT};
pub use review::verdict::Verdict;
