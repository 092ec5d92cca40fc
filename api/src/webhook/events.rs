//! Webhook vendor detection and event payload normalization.
//!
//! Each vendor announces the event type in its own header and ships its own
//! payload shape; everything is normalized into [`PrEvent`] before the
//! pipeline runs.

use axum::http::HeaderMap;
use serde::Deserialize;

use pr_reviewer::git_providers::PrAction;
use pr_reviewer::PrEvent;

/// Webhook-sending vendor, detected from the event header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookVendor {
    GitHub,
    GitLab,
    Gitea,
}

impl WebhookVendor {
    /// Detects the vendor from its event header.
    pub fn detect(headers: &HeaderMap) -> Option<Self> {
        if headers.contains_key("x-github-event") {
            Some(Self::GitHub)
        } else if headers.contains_key("x-gitlab-event") {
            Some(Self::GitLab)
        } else if headers.contains_key("x-gitea-event") {
            Some(Self::Gitea)
        } else {
            None
        }
    }

    /// The vendor's event name for this request.
    pub fn event_name(self, headers: &HeaderMap) -> String {
        let header = match self {
            Self::GitHub => "x-github-event",
            Self::GitLab => "x-gitlab-event",
            Self::Gitea => "x-gitea-event",
        };
        headers
            .get(header)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }
}

/// Outcome of payload parsing.
#[derive(Debug)]
pub enum ParsedEvent {
    /// Liveness probe; answered immediately.
    Ping,
    /// Recognized but irrelevant event type.
    Ignored(&'static str),
    /// A pull/merge request event to feed into the pipeline.
    PullRequest(PrEvent),
}

/// Parses a vendor payload into a normalized event.
pub fn parse_event(
    vendor: WebhookVendor,
    event_name: &str,
    body: &[u8],
) -> Result<ParsedEvent, &'static str> {
    if event_name.eq_ignore_ascii_case("ping") {
        return Ok(ParsedEvent::Ping);
    }

    match (vendor, event_name) {
        (WebhookVendor::GitHub, "pull_request") => {
            let event: GitHubPullRequestEvent =
                serde_json::from_slice(body).map_err(|_| "invalid pull_request payload")?;
            Ok(ParsedEvent::PullRequest(PrEvent {
                owner: event.repository.owner.login,
                repo: event.repository.name,
                number: event.pull_request.number,
                action: PrAction::from_provider(&event.action),
                base_sha: event.pull_request.base.sha,
                head_sha: event.pull_request.head.sha,
            }))
        }
        (WebhookVendor::Gitea, "pull_request") => {
            let event: GiteaPullRequestEvent =
                serde_json::from_slice(body).map_err(|_| "invalid pull_request payload")?;
            Ok(ParsedEvent::PullRequest(PrEvent {
                owner: event.repository.owner.username,
                repo: event.repository.name,
                number: event.pull_request.number,
                action: PrAction::from_provider(&event.action),
                base_sha: event.pull_request.base.sha,
                head_sha: event.pull_request.head.sha,
            }))
        }
        (WebhookVendor::GitLab, "Merge Request Hook") => {
            let event: GitLabMergeRequestEvent =
                serde_json::from_slice(body).map_err(|_| "invalid merge request payload")?;
            let (owner, repo) = event
                .project
                .path_with_namespace
                .rsplit_once('/')
                .map(|(ns, name)| (ns.to_string(), name.to_string()))
                .ok_or("invalid project path")?;
            let attrs = event.object_attributes;
            Ok(ParsedEvent::PullRequest(PrEvent {
                owner,
                repo,
                number: attrs.iid,
                action: PrAction::from_provider(&attrs.action.unwrap_or_default()),
                base_sha: attrs.oldrev.unwrap_or_default(),
                head_sha: attrs.last_commit.map(|c| c.id).unwrap_or_default(),
            }))
        }
        _ => Ok(ParsedEvent::Ignored("unsupported event type")),
    }
}

/// --- Vendor payload shapes (subset of fields we actually use) ---

#[derive(Debug, Deserialize)]
struct GitHubPullRequestEvent {
    #[serde(default)]
    action: String,
    pull_request: GitHubPr,
    repository: GitHubRepository,
}

#[derive(Debug, Deserialize)]
struct GitHubPr {
    number: u64,
    base: ShaRef,
    head: ShaRef,
}

#[derive(Debug, Deserialize)]
struct GitHubRepository {
    name: String,
    owner: GitHubOwner,
}

#[derive(Debug, Deserialize)]
struct GitHubOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ShaRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GiteaPullRequestEvent {
    #[serde(default)]
    action: String,
    pull_request: GiteaPr,
    repository: GiteaRepository,
}

#[derive(Debug, Deserialize)]
struct GiteaPr {
    number: u64,
    base: ShaRef,
    head: ShaRef,
}

#[derive(Debug, Deserialize)]
struct GiteaRepository {
    name: String,
    owner: GiteaOwner,
}

#[derive(Debug, Deserialize)]
struct GiteaOwner {
    username: String,
}

#[derive(Debug, Deserialize)]
struct GitLabMergeRequestEvent {
    object_attributes: GitLabMrAttributes,
    project: GitLabProject,
}

#[derive(Debug, Deserialize)]
struct GitLabMrAttributes {
    iid: u64,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    oldrev: Option<String>,
    #[serde(default)]
    last_commit: Option<GitLabCommit>,
}

#[derive(Debug, Deserialize)]
struct GitLabCommit {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GitLabProject {
    path_with_namespace: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vendor_detection_by_event_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-github-event", "pull_request".parse().expect("header"));
        assert_eq!(WebhookVendor::detect(&headers), Some(WebhookVendor::GitHub));
        assert_eq!(
            WebhookVendor::GitHub.event_name(&headers),
            "pull_request".to_string()
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-gitlab-event",
            "Merge Request Hook".parse().expect("header"),
        );
        assert_eq!(WebhookVendor::detect(&headers), Some(WebhookVendor::GitLab));

        assert_eq!(WebhookVendor::detect(&HeaderMap::new()), None);
    }

    #[test]
    fn ping_events_answer_immediately() {
        let parsed =
            parse_event(WebhookVendor::GitHub, "ping", b"{}").expect("parse");
        assert!(matches!(parsed, ParsedEvent::Ping));
    }

    #[test]
    fn github_payloads_normalize() {
        let body = json!({
            "action": "synchronize",
            "pull_request": {
                "number": 7,
                "base": { "sha": "base1" },
                "head": { "sha": "head1" }
            },
            "repository": { "name": "widgets", "owner": { "login": "acme" } }
        });
        let parsed = parse_event(
            WebhookVendor::GitHub,
            "pull_request",
            body.to_string().as_bytes(),
        )
        .expect("parse");

        let ParsedEvent::PullRequest(event) = parsed else {
            panic!("expected a pull request event");
        };
        assert_eq!(event.owner, "acme");
        assert_eq!(event.repo, "widgets");
        assert_eq!(event.number, 7);
        assert_eq!(event.action, PrAction::Synchronized);
        assert_eq!(event.base_sha, "base1");
        assert_eq!(event.head_sha, "head1");
    }

    #[test]
    fn gitlab_payloads_normalize_with_nested_namespaces() {
        let body = json!({
            "object_kind": "merge_request",
            "object_attributes": {
                "iid": 12,
                "action": "update",
                "oldrev": "old1",
                "last_commit": { "id": "new1" }
            },
            "project": { "path_with_namespace": "group/sub/widgets" }
        });
        let parsed = parse_event(
            WebhookVendor::GitLab,
            "Merge Request Hook",
            body.to_string().as_bytes(),
        )
        .expect("parse");

        let ParsedEvent::PullRequest(event) = parsed else {
            panic!("expected a pull request event");
        };
        assert_eq!(event.owner, "group/sub");
        assert_eq!(event.repo, "widgets");
        assert_eq!(event.action, PrAction::Synchronized);
        assert_eq!(event.head_sha, "new1");
    }

    #[test]
    fn gitea_payloads_normalize() {
        let body = json!({
            "action": "opened",
            "pull_request": {
                "number": 3,
                "base": { "sha": "b" },
                "head": { "sha": "h" }
            },
            "repository": { "name": "widgets", "owner": { "username": "acme" } }
        });
        let parsed = parse_event(
            WebhookVendor::Gitea,
            "pull_request",
            body.to_string().as_bytes(),
        )
        .expect("parse");
        assert!(matches!(
            parsed,
            ParsedEvent::PullRequest(PrEvent {
                action: PrAction::Opened,
                ..
            })
        ));
    }

    #[test]
    fn unsupported_events_are_ignored_not_rejected() {
        let parsed = parse_event(WebhookVendor::GitHub, "push", b"{}").expect("parse");
        assert!(matches!(parsed, ParsedEvent::Ignored(_)));
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        assert!(parse_event(WebhookVendor::GitHub, "pull_request", b"{]").is_err());
        assert!(parse_event(WebhookVendor::GitHub, "pull_request", b"{}").is_err());
    }
}
