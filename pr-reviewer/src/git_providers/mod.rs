//! Platform adapter facade without async-trait or dynamic trait objects.
//!
//! A `ProviderClient` enum exposes the three operations the pipeline
//! consumes — fetch PR metadata, compare commits, post a review — with
//! concrete implementations per platform.

pub mod types;
pub use types::*;

pub mod gitea;
pub mod github;
pub mod gitlab;

use std::time::Duration;

use crate::errors::MrResult;

/// Runtime configuration for the active platform client.
#[derive(Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// API base, e.g. "https://api.github.com" or "https://gitlab.com/api/v4".
    pub base_api: String,
    /// Access token for the platform (PAT or app token).
    pub token: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("base_api", &self.base_api)
            .field("token", &"***")
            .finish()
    }
}

/// Concrete platform client (enum-dispatch).
#[derive(Debug, Clone)]
pub enum ProviderClient {
    GitHub(github::GitHubClient),
    GitLab(gitlab::GitLabClient),
    Gitea(gitea::GiteaClient),
}

impl ProviderClient {
    /// Constructs a concrete client from generic config.
    pub fn from_config(cfg: ProviderConfig) -> MrResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("pr-ai-backend/0.1")
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()?;
        let base = cfg.base_api.trim_end_matches('/').to_string();
        Ok(match cfg.kind {
            ProviderKind::GitHub => {
                Self::GitHub(github::GitHubClient::new(client, base, cfg.token))
            }
            ProviderKind::GitLab => {
                Self::GitLab(gitlab::GitLabClient::new(client, base, cfg.token))
            }
            ProviderKind::Gitea => Self::Gitea(gitea::GiteaClient::new(client, base, cfg.token)),
        })
    }

    /// Fetches normalized PR metadata (state, labels, SHAs).
    pub async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> MrResult<PullRequestRef> {
        match self {
            Self::GitHub(c) => c.get_pull_request(owner, repo, number).await,
            Self::GitLab(c) => c.get_pull_request(owner, repo, number).await,
            Self::Gitea(c) => c.get_pull_request(owner, repo, number).await,
        }
    }

    /// Compares two commits: changed files plus the commit range.
    pub async fn compare_commits(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> MrResult<(Vec<CommitFile>, Vec<Commit>)> {
        match self {
            Self::GitHub(c) => c.compare_commits(owner, repo, base, head).await,
            Self::GitLab(c) => c.compare_commits(owner, repo, base, head).await,
            Self::Gitea(c) => c.compare_commits(owner, repo, base, head).await,
        }
    }

    /// Posts the review: a top-level body plus per-file comments anchored at
    /// `commit_sha`.
    pub async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        commit_sha: &str,
        comments: &[ReviewComment],
        body: &str,
    ) -> MrResult<()> {
        match self {
            Self::GitHub(c) => c.create_review(owner, repo, number, commit_sha, comments, body).await,
            Self::GitLab(c) => c.create_review(owner, repo, number, commit_sha, comments, body).await,
            Self::Gitea(c) => c.create_review(owner, repo, number, commit_sha, comments, body).await,
        }
    }
}
