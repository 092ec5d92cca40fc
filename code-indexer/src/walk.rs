//! Repository tree walk and file classification.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

/// Directories that never contain indexable first-party code.
const SKIP_DIRS: &[&str] = &[".git", "node_modules", "vendor", ".vscode"];

/// Extensions that are binary, archived or otherwise not worth indexing.
const SKIP_EXTENSIONS: &[&str] = &[
    ".exe", ".bin", ".obj", ".o", ".a", ".so", ".dll", ".dylib", ".jar", ".war", ".ear", ".class",
    ".zip", ".tar", ".gz", ".bz2", ".7z", ".rar", ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".ico",
    ".svg", ".mp3", ".mp4", ".avi", ".mov", ".wmv", ".pdf", ".doc", ".docx", ".xls", ".xlsx",
    ".ppt", ".pptx", ".lock", ".sum",
];

/// Collects the indexable files of a working copy, repo-relative.
pub fn scan_repository_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        if should_index_file(&rel.to_string_lossy()) {
            out.push(rel.to_path_buf());
        }
    }
    out
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| SKIP_DIRS.contains(&name))
            .unwrap_or(false)
}

/// Filters out hidden files and non-indexable extensions.
pub fn should_index_file(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    if SKIP_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return false;
    }
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    !base.starts_with('.')
}

/// Maps a file extension to the language tag stored with its snippets.
pub fn file_language(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "go" => "go",
        "js" | "jsx" | "ts" | "tsx" => "javascript",
        "py" => "python",
        "java" => "java",
        "rb" => "ruby",
        "php" => "php",
        "c" | "cpp" | "cc" | "h" | "hpp" => "cpp",
        "cs" => "csharp",
        "rs" => "rust",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        _ => "text",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn walk_skips_vendored_hidden_and_binary_files() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path();
        fs::create_dir_all(root.join(".git")).expect("mkdir");
        fs::create_dir_all(root.join("node_modules/dep")).expect("mkdir");
        fs::create_dir_all(root.join("src")).expect("mkdir");
        fs::write(root.join(".git/config"), "x").expect("write");
        fs::write(root.join("node_modules/dep/index.js"), "x").expect("write");
        fs::write(root.join("src/main.rs"), "fn main() {}").expect("write");
        fs::write(root.join("src/logo.png"), [0u8; 4]).expect("write");
        fs::write(root.join("Cargo.lock"), "x").expect("write");
        fs::write(root.join(".env"), "SECRET=1").expect("write");

        let mut files = scan_repository_files(root);
        files.sort();
        assert_eq!(files, vec![PathBuf::from("src/main.rs")]);
    }

    #[test]
    fn language_detection_by_extension() {
        assert_eq!(file_language("src/lib.rs"), "rust");
        assert_eq!(file_language("app/web.tsx"), "javascript");
        assert_eq!(file_language("Makefile"), "text");
        assert_eq!(file_language("include/hash.hpp"), "cpp");
    }

    #[test]
    fn hidden_files_are_not_indexable_even_in_subdirs() {
        assert!(!should_index_file("config/.secret"));
        assert!(!should_index_file("go.sum"));
        assert!(should_index_file("config/settings.yaml"));
    }
}
