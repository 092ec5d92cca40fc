//! GitHub provider (REST v3) for PR metadata, comparisons and reviews.
//!
//! Endpoints used:
//! - GET  /repos/:owner/:repo/pulls/:number
//! - GET  /repos/:owner/:repo/compare/:base...:head
//! - POST /repos/:owner/:repo/pulls/:number/reviews

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::MrResult;
use crate::git_providers::types::*;

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_api: String, // e.g. "https://api.github.com"
    token: String,
}

impl GitHubClient {
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        Self {
            http,
            base_api,
            token,
        }
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
    }

    /// Fetches PR metadata including labels, lock state and SHAs.
    pub async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> MrResult<PullRequestRef> {
        let url = format!("{}/repos/{owner}/{repo}/pulls/{number}", self.base_api);
        let resp: GitHubPr = self
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(PullRequestRef {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number: resp.number,
            title: resp.title,
            base_sha: resp.base.sha,
            head_sha: resp.head.sha,
            action: PrAction::Other,
            labels: resp.labels.into_iter().map(|l| l.name).collect(),
            locked: resp.locked,
            state: if resp.state == "closed" {
                PrState::Closed
            } else {
                PrState::Open
            },
            html_url: resp.html_url,
        })
    }

    /// Compares two commits. Binary files carry no `patch` field and surface
    /// with an empty patch.
    pub async fn compare_commits(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> MrResult<(Vec<CommitFile>, Vec<Commit>)> {
        let url = format!(
            "{}/repos/{owner}/{repo}/compare/{base}...{head}",
            self.base_api
        );
        let resp: GitHubComparison = self
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let files = resp
            .files
            .into_iter()
            .map(|f| CommitFile {
                path: f.filename,
                status: FileStatus::from_provider(&f.status),
                patch: f.patch.unwrap_or_default(),
                contents_url: f.contents_url,
            })
            .collect();
        let commits = resp
            .commits
            .into_iter()
            .map(|c| Commit { sha: c.sha })
            .collect();
        Ok((files, commits))
    }

    /// Posts a COMMENT review with per-file positioned comments.
    pub async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        commit_sha: &str,
        comments: &[ReviewComment],
        body: &str,
    ) -> MrResult<()> {
        let url = format!(
            "{}/repos/{owner}/{repo}/pulls/{number}/reviews",
            self.base_api
        );
        let payload = GitHubReviewRequest {
            commit_id: commit_sha,
            body,
            event: "COMMENT",
            comments: comments
                .iter()
                .map(|c| GitHubReviewComment {
                    path: &c.path,
                    body: &c.body,
                    position: c.position,
                })
                .collect(),
        };

        self.http
            .post(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// --- GitHub response/request shapes (subset of fields we actually use) ---

#[derive(Debug, Deserialize)]
struct GitHubPr {
    number: u64,
    title: String,
    state: String,
    #[serde(default)]
    locked: bool,
    #[serde(default)]
    labels: Vec<GitHubLabel>,
    base: GitHubRef,
    head: GitHubRef,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct GitHubLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GitHubRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubComparison {
    #[serde(default)]
    files: Vec<GitHubFile>,
    #[serde(default)]
    commits: Vec<GitHubCommit>,
}

#[derive(Debug, Deserialize)]
struct GitHubFile {
    filename: String,
    status: String,
    #[serde(default)]
    patch: Option<String>, // absent for binary files
    #[serde(default)]
    contents_url: String,
}

#[derive(Debug, Deserialize)]
struct GitHubCommit {
    sha: String,
}

#[derive(Debug, Serialize)]
struct GitHubReviewRequest<'a> {
    commit_id: &'a str,
    body: &'a str,
    event: &'a str,
    comments: Vec<GitHubReviewComment<'a>>,
}

#[derive(Debug, Serialize)]
struct GitHubReviewComment<'a> {
    path: &'a str,
    body: &'a str,
    position: i64,
}
