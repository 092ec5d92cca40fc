//! GitLab provider (REST v4) for MR metadata, comparisons and review notes.
//!
//! Endpoints used:
//! - GET  /projects/:id/merge_requests/:iid
//! - GET  /projects/:id/repository/compare?from=:base&to=:head
//! - POST /projects/:id/merge_requests/:iid/notes
//! - POST /projects/:id/merge_requests/:iid/discussions
//!
//! GitLab has no single "review" call; the top-level body goes out as a
//! note and each per-file comment as a positioned discussion. A discussion
//! whose position is rejected degrades to a plain note so the feedback is
//! never lost.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::MrResult;
use crate::git_providers::types::*;

#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    base_api: String, // e.g. "https://gitlab.com/api/v4"
    token: String,    // "PRIVATE-TOKEN"
}

impl GitLabClient {
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        Self {
            http,
            base_api,
            token,
        }
    }

    fn project_path(owner: &str, repo: &str) -> String {
        urlencoding::encode(&format!("{owner}/{repo}")).into_owned()
    }

    /// Fetches MR metadata; `diff_refs` supplies base/head SHAs.
    pub async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> MrResult<PullRequestRef> {
        let url = format!(
            "{}/projects/{}/merge_requests/{number}",
            self.base_api,
            Self::project_path(owner, repo)
        );
        let resp: GitLabMr = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(PullRequestRef {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number: resp.iid,
            title: resp.title,
            base_sha: resp.diff_refs.base_sha,
            head_sha: resp.diff_refs.head_sha,
            action: PrAction::Other,
            labels: resp.labels,
            locked: resp.discussion_locked.unwrap_or(false),
            state: if resp.state == "opened" {
                PrState::Open
            } else {
                PrState::Closed
            },
            html_url: resp.web_url,
        })
    }

    /// Compares two commits via the repository compare API.
    pub async fn compare_commits(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> MrResult<(Vec<CommitFile>, Vec<Commit>)> {
        let project = Self::project_path(owner, repo);
        let url = format!(
            "{}/projects/{project}/repository/compare?from={base}&to={head}",
            self.base_api
        );
        let resp: GitLabComparison = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let files = resp
            .diffs
            .into_iter()
            .map(|d| {
                let status = if d.new_file {
                    FileStatus::Added
                } else if d.deleted_file {
                    FileStatus::Removed
                } else if d.renamed_file {
                    FileStatus::Renamed
                } else {
                    FileStatus::Modified
                };
                let contents_url = format!(
                    "{}/projects/{project}/repository/files/{}/raw?ref={head}",
                    self.base_api,
                    urlencoding::encode(&d.new_path)
                );
                CommitFile {
                    path: d.new_path,
                    status,
                    patch: d.diff,
                    contents_url,
                }
            })
            .collect();
        let commits = resp
            .commits
            .into_iter()
            .map(|c| Commit { sha: c.id })
            .collect();
        Ok((files, commits))
    }

    /// Posts the top-level note and one discussion per file comment.
    pub async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        commit_sha: &str,
        comments: &[ReviewComment],
        body: &str,
    ) -> MrResult<()> {
        let project = Self::project_path(owner, repo);

        if !body.is_empty() {
            self.create_note(&project, number, body).await?;
        }

        for comment in comments {
            let url = format!(
                "{}/projects/{project}/merge_requests/{number}/discussions",
                self.base_api
            );
            let payload = GitLabDiscussionRequest {
                body: &comment.body,
                position: GitLabPosition {
                    position_type: "text",
                    base_sha: commit_sha,
                    start_sha: commit_sha,
                    head_sha: commit_sha,
                    new_path: &comment.path,
                    new_line: comment.position.max(1),
                },
            };
            let resp = self
                .http
                .post(url)
                .header("PRIVATE-TOKEN", &self.token)
                .json(&payload)
                .send()
                .await?;

            if !resp.status().is_success() {
                warn!(
                    "positioned discussion on {} rejected (status {}); posting a note instead",
                    comment.path,
                    resp.status()
                );
                let fallback = format!("**{}**\n\n{}", comment.path, comment.body);
                self.create_note(&project, number, &fallback).await?;
            }
        }
        Ok(())
    }

    async fn create_note(&self, project: &str, number: u64, body: &str) -> MrResult<()> {
        let url = format!(
            "{}/projects/{project}/merge_requests/{number}/notes",
            self.base_api
        );
        self.http
            .post(url)
            .header("PRIVATE-TOKEN", &self.token)
            .json(&GitLabNoteRequest { body })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// --- GitLab response/request shapes (subset of fields we actually use) ---

#[derive(Debug, Deserialize)]
struct GitLabMr {
    iid: u64,
    title: String,
    state: String,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    discussion_locked: Option<bool>,
    web_url: String,
    diff_refs: GitLabDiffRefs,
}

#[derive(Debug, Deserialize)]
struct GitLabDiffRefs {
    base_sha: String,
    head_sha: String,
}

#[derive(Debug, Deserialize)]
struct GitLabComparison {
    #[serde(default)]
    commits: Vec<GitLabCommit>,
    #[serde(default)]
    diffs: Vec<GitLabDiff>,
}

#[derive(Debug, Deserialize)]
struct GitLabCommit {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GitLabDiff {
    new_path: String,
    new_file: bool,
    deleted_file: bool,
    renamed_file: bool,
    #[serde(default)]
    diff: String,
}

#[derive(Debug, Serialize)]
struct GitLabNoteRequest<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct GitLabDiscussionRequest<'a> {
    body: &'a str,
    position: GitLabPosition<'a>,
}

#[derive(Debug, Serialize)]
struct GitLabPosition<'a> {
    position_type: &'a str,
    base_sha: &'a str,
    start_sha: &'a str,
    head_sha: &'a str,
    new_path: &'a str,
    new_line: i64,
}
