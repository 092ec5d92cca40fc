//! Provider-agnostic data model for pull requests and their diffs.

use serde::{Deserialize, Serialize};

/// Supported platforms. Exactly one is active per process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProviderKind {
    GitHub,
    GitLab,
    Gitea,
}

/// Normalized webhook action across vendors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PrAction {
    Opened,
    Synchronized,
    Closed,
    Reopened,
    Other,
}

impl PrAction {
    /// Maps a vendor action string onto the normalized set.
    ///
    /// GitHub uses `opened`/`synchronize`, Gitea `opened`/`synchronized`,
    /// GitLab `open`/`update`.
    pub fn from_provider(raw: &str) -> Self {
        match raw {
            "opened" | "open" => Self::Opened,
            "synchronize" | "synchronized" | "update" => Self::Synchronized,
            "closed" | "close" => Self::Closed,
            "reopened" | "reopen" => Self::Reopened,
            _ => Self::Other,
        }
    }
}

/// Open/closed state of a pull request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PrState {
    Open,
    Closed,
}

/// Normalized pull request. Created once per handler invocation from the
/// webhook event plus adapter metadata, then never mutated.
#[derive(Debug, Clone)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub base_sha: String,
    pub head_sha: String,
    pub action: PrAction,
    pub labels: Vec<String>,
    pub locked: bool,
    pub state: PrState,
    pub html_url: String,
}

/// Status of one changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
}

impl FileStatus {
    pub fn from_provider(raw: &str) -> Self {
        match raw {
            "added" | "new" => Self::Added,
            "removed" | "deleted" => Self::Removed,
            "renamed" => Self::Renamed,
            _ => Self::Modified,
        }
    }
}

/// One changed file of a comparison. Binary files surface with an empty
/// patch and are skipped by the filter.
#[derive(Debug, Clone)]
pub struct CommitFile {
    pub path: String,
    pub status: FileStatus,
    pub patch: String,
    pub contents_url: String,
}

/// A commit SHA in the compared range.
#[derive(Debug, Clone)]
pub struct Commit {
    pub sha: String,
}

/// One rendered per-file comment ready for posting.
#[derive(Debug, Clone)]
pub struct ReviewComment {
    pub path: String,
    pub body: String,
    pub position: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_normalize_across_vendors() {
        assert_eq!(PrAction::from_provider("opened"), PrAction::Opened);
        assert_eq!(PrAction::from_provider("open"), PrAction::Opened);
        assert_eq!(PrAction::from_provider("synchronize"), PrAction::Synchronized);
        assert_eq!(PrAction::from_provider("synchronized"), PrAction::Synchronized);
        assert_eq!(PrAction::from_provider("update"), PrAction::Synchronized);
        assert_eq!(PrAction::from_provider("labeled"), PrAction::Other);
    }

    #[test]
    fn file_statuses_normalize() {
        assert_eq!(FileStatus::from_provider("added"), FileStatus::Added);
        assert_eq!(FileStatus::from_provider("deleted"), FileStatus::Removed);
        assert_eq!(FileStatus::from_provider("changed"), FileStatus::Modified);
    }
}
