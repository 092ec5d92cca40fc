//! Gitea provider (REST v1) for PR metadata, comparisons and reviews.
//!
//! Gitea exposes no compare-files API, so the client locates the open PR
//! matching the head SHA, lists its commits, downloads the raw unified diff
//! (`/pulls/:index.diff`) and splits it into per-file patches at
//! `diff --git` boundaries.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::MrResult;
use crate::git_providers::types::*;

#[derive(Debug, Clone)]
pub struct GiteaClient {
    http: Client,
    base_api: String, // instance root, e.g. "https://gitea.example.com"
    token: String,
}

impl GiteaClient {
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
            .header("Authorization", format!("token {}", self.token))
    }

    pub async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> MrResult<PullRequestRef> {
        let url = format!(
            "{}/api/v1/repos/{owner}/{repo}/pulls/{number}",
            self.base_api
        );
        let resp: GiteaPr = self
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
            locked: false,
            state: if resp.state == "closed" {
                PrState::Closed
            } else {
                PrState::Open
            },
            html_url: resp.html_url,
        })
    }

    pub async fn compare_commits(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> MrResult<(Vec<CommitFile>, Vec<Commit>)> {
        // Locate the open PR whose head matches.
        let url = format!(
            "{}/api/v1/repos/{owner}/{repo}/pulls?state=open&sort=recentupdate",
            self.base_api
        );
        let prs: Vec<GiteaPr> = self
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(pr) = prs.into_iter().find(|p| p.head.sha == head) else {
            warn!("no open PR found for head {head}; returning the bare range");
            return Ok((
                Vec::new(),
                vec![
                    Commit {
                        sha: base.to_string(),
                    },
                    Commit {
                        sha: head.to_string(),
                    },
                ],
            ));
        };

        let commits_url = format!(
            "{}/api/v1/repos/{owner}/{repo}/pulls/{}/commits",
            self.base_api, pr.number
        );
        let raw_commits: Vec<GiteaCommit> = self
            .get(commits_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let commits = raw_commits
            .into_iter()
            .map(|c| Commit { sha: c.sha })
            .collect();

        let diff_url = format!(
            "{}/api/v1/repos/{owner}/{repo}/pulls/{}.diff",
            self.base_api, pr.number
        );
        let diff = self
            .get(diff_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok((split_unified_diff(&diff), commits))
    }

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
            "{}/api/v1/repos/{owner}/{repo}/pulls/{number}/reviews",
            self.base_api
        );
        let payload = GiteaReviewRequest {
            commit_id: commit_sha,
            body,
            event: "COMMENT",
            comments: comments
                .iter()
                .map(|c| GiteaReviewComment {
                    path: &c.path,
                    body: &c.body,
                    new_position: c.position.max(0) as u64,
                })
                .collect(),
        };

        self.http
            .post(url)
            .header("Authorization", format!("token {}", self.token))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Splits a raw unified diff into per-file changes.
///
/// The patch body starts at the first hunk header so it matches the shape
/// other platforms deliver; header-only segments (binary files) surface
/// with an empty patch.
fn split_unified_diff(diff: &str) -> Vec<CommitFile> {
    const MARKER: &str = "diff --git ";

    let mut files = Vec::new();
    let mut starts: Vec<usize> = diff
        .match_indices(MARKER)
        .map(|(i, _)| i)
        .filter(|&i| i == 0 || diff.as_bytes()[i - 1] == b'\n')
        .collect();
    starts.push(diff.len());

    for window in starts.windows(2) {
        let segment = &diff[window[0]..window[1]];
        let mut status = FileStatus::Modified;
        let mut old_path = None;
        let mut new_path = None;

        for line in segment.lines() {
            if let Some(p) = line.strip_prefix("--- a/") {
                old_path = Some(p.to_string());
            } else if let Some(p) = line.strip_prefix("+++ b/") {
                new_path = Some(p.to_string());
            } else if line.starts_with("new file mode") || line.starts_with("--- /dev/null") {
                status = FileStatus::Added;
            } else if line.starts_with("deleted file mode") || line.starts_with("+++ /dev/null") {
                status = FileStatus::Removed;
            } else if line.starts_with("rename from") {
                status = FileStatus::Renamed;
            } else if line.starts_with("@@") {
                break;
            }
        }

        // Binary segments carry no ---/+++ lines; fall back to the header.
        let header_path = segment
            .lines()
            .next()
            .and_then(|l| l.rsplit_once(" b/"))
            .map(|(_, p)| p.to_string());
        let Some(path) = new_path.or(old_path).or(header_path) else {
            continue;
        };
        let patch = segment
            .find("\n@@")
            .map(|i| segment[i + 1..].to_string())
            .unwrap_or_default();

        files.push(CommitFile {
            path,
            status,
            patch,
            contents_url: String::new(),
        });
    }
    files
}

/// --- Gitea response/request shapes (subset of fields we actually use) ---

#[derive(Debug, Deserialize)]
struct GiteaPr {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    labels: Vec<GiteaLabel>,
    base: GiteaRef,
    head: GiteaRef,
    #[serde(default)]
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct GiteaLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GiteaRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GiteaCommit {
    sha: String,
}

#[derive(Debug, Serialize)]
struct GiteaReviewRequest<'a> {
    commit_id: &'a str,
    body: &'a str,
    event: &'a str,
    comments: Vec<GiteaReviewComment<'a>>,
}

#[derive(Debug, Serialize)]
struct GiteaReviewComment<'a> {
    path: &'a str,
    body: &'a str,
    new_position: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIFF: &str = "diff --git a/src/lib.rs b/src/lib.rs\n\
index 111..222 100644\n\
--- a/src/lib.rs\n\
+++ b/src/lib.rs\n\
@@ -1,2 +1,3 @@\n\
 fn a() {}\n\
+fn b() {}\n\
diff --git a/new.rs b/new.rs\n\
new file mode 100644\n\
--- /dev/null\n\
+++ b/new.rs\n\
@@ -0,0 +1 @@\n\
+fn c() {}\n\
diff --git a/logo.png b/logo.png\n\
Binary files differ\n";

    #[test]
    fn unified_diffs_split_per_file() {
        let files = split_unified_diff(DIFF);
        assert_eq!(files.len(), 3);

        assert_eq!(files[0].path, "src/lib.rs");
        assert_eq!(files[0].status, FileStatus::Modified);
        assert!(files[0].patch.starts_with("@@ -1,2 +1,3 @@"));
        assert!(files[0].patch.contains("+fn b() {}"));

        assert_eq!(files[1].path, "new.rs");
        assert_eq!(files[1].status, FileStatus::Added);

        // Binary segment has no hunks: empty patch.
        assert_eq!(files[2].path, "logo.png");
        assert!(files[2].patch.is_empty());
    }

    #[test]
    fn empty_diff_yields_no_files() {
        assert!(split_unified_diff("").is_empty());
    }
}
