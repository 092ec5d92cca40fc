//! Patch filter: selects the reviewable files of a comparison.
//!
//! A file is retained iff it is not exact-listed in the ignore list, the
//! include set is empty or matches it, no ignore pattern matches it, its
//! status is modified/added, and its patch is non-empty and within the
//! configured size cap.
//!
//! Glob semantics: `"*"` matches everything; a leading `/` anchors the
//! pattern to the repository root; any other pattern matches both at the
//! top level and at any depth (`x.rs` behaves like `**/x.rs`).

use tracing::debug;

use crate::git_providers::{CommitFile, FileStatus};

/// Filter inputs, split off the review configuration.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    pub include_patterns: Vec<String>,
    pub ignore_patterns: Vec<String>,
    /// Exact path matches, one per entry.
    pub ignore_list: Vec<String>,
    /// Per-file patch byte cap; 0 disables.
    pub max_patch_length: usize,
}

/// Applies the filter, preserving input order.
pub fn filter_files<'a>(files: &'a [CommitFile], cfg: &FilterConfig) -> Vec<&'a CommitFile> {
    let mut retained = Vec::new();
    for file in files {
        if cfg.ignore_list.iter().any(|entry| entry == &file.path) {
            debug!("{} dropped: listed in ignore list", file.path);
            continue;
        }
        if !cfg.include_patterns.is_empty() && !matches_patterns(&cfg.include_patterns, &file.path)
        {
            debug!("{} dropped: no include pattern matches", file.path);
            continue;
        }
        if matches_patterns(&cfg.ignore_patterns, &file.path) {
            debug!("{} dropped: ignore pattern matches", file.path);
            continue;
        }
        if !matches!(file.status, FileStatus::Modified | FileStatus::Added) {
            debug!("{} dropped: status {:?}", file.path, file.status);
            continue;
        }
        if file.patch.is_empty() {
            debug!("{} dropped: empty patch", file.path);
            continue;
        }
        if cfg.max_patch_length > 0 && file.patch.len() > cfg.max_patch_length {
            debug!(
                "{} dropped: patch of {} bytes exceeds cap {}",
                file.path,
                file.patch.len(),
                cfg.max_patch_length
            );
            continue;
        }
        retained.push(file);
    }
    retained
}

/// True when any pattern in the set matches the repo-relative path.
pub fn matches_patterns(patterns: &[String], path: &str) -> bool {
    patterns.iter().any(|p| pattern_matches(p.trim(), path))
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    if pattern == "*" {
        return true;
    }
    if let Some(anchored) = pattern.strip_prefix('/') {
        return glob_match(anchored, path);
    }
    if pattern.starts_with("**") {
        return glob_match(pattern, path);
    }
    glob_match(pattern, path) || glob_match(&format!("**/{pattern}"), path)
}

fn glob_match(pattern: &str, path: &str) -> bool {
    glob::Pattern::new(pattern)
        .map(|g| g.matches(path))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, status: FileStatus, patch: &str) -> CommitFile {
        CommitFile {
            path: path.to_string(),
            status,
            patch: patch.to_string(),
            contents_url: String::new(),
        }
    }

    #[test]
    fn star_includes_everything_except_exact_ignores() {
        let files = vec![
            file("src/a.rs", FileStatus::Modified, "@@"),
            file("docs/b.md", FileStatus::Modified, "@@"),
        ];
        let cfg = FilterConfig {
            include_patterns: vec!["*".into()],
            ignore_list: vec!["docs/b.md".into()],
            ..Default::default()
        };
        let kept = filter_files(&files, &cfg);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].path, "src/a.rs");
    }

    #[test]
    fn leading_slash_anchors_to_the_root() {
        let patterns = vec!["/x/**".to_string()];
        assert!(matches_patterns(&patterns, "x/y"));
        assert!(matches_patterns(&patterns, "x/y/z"));
        assert!(!matches_patterns(&patterns, "a/x/y"));
    }

    #[test]
    fn bare_patterns_match_at_any_depth() {
        let patterns = vec!["*.rs".to_string()];
        assert!(matches_patterns(&patterns, "main.rs"));
        assert!(matches_patterns(&patterns, "src/deep/main.rs"));
        assert!(!matches_patterns(&patterns, "main.go"));
    }

    #[test]
    fn ignore_list_is_exact_match_only() {
        let files = vec![
            file("a/config.yaml", FileStatus::Modified, "@@"),
            file("config.yaml", FileStatus::Modified, "@@"),
        ];
        let cfg = FilterConfig {
            ignore_list: vec!["config.yaml".into()],
            ..Default::default()
        };
        let kept = filter_files(&files, &cfg);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].path, "a/config.yaml");
    }

    #[test]
    fn only_modified_and_added_files_are_reviewable() {
        let files = vec![
            file("a.rs", FileStatus::Modified, "@@"),
            file("b.rs", FileStatus::Added, "@@"),
            file("c.rs", FileStatus::Removed, "@@"),
            file("d.rs", FileStatus::Renamed, "@@"),
        ];
        let kept = filter_files(&files, &FilterConfig::default());
        let paths: Vec<_> = kept.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "b.rs"]);
    }

    #[test]
    fn empty_and_oversized_patches_are_dropped() {
        let files = vec![
            file("empty.rs", FileStatus::Modified, ""),
            file("big.rs", FileStatus::Modified, &"x".repeat(100)),
            file("ok.rs", FileStatus::Modified, "@@ small"),
        ];
        let cfg = FilterConfig {
            max_patch_length: 50,
            ..Default::default()
        };
        let kept = filter_files(&files, &cfg);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].path, "ok.rs");

        // 0 disables the cap.
        let kept = filter_files(&files, &FilterConfig::default());
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn ignore_patterns_beat_includes() {
        let files = vec![
            file("src/gen/out.rs", FileStatus::Modified, "@@"),
            file("src/lib.rs", FileStatus::Modified, "@@"),
        ];
        let cfg = FilterConfig {
            include_patterns: vec!["*.rs".into()],
            ignore_patterns: vec!["/src/gen/**".into()],
            ..Default::default()
        };
        let kept = filter_files(&files, &cfg);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].path, "src/lib.rs");
    }
}
