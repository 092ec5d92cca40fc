//! Identifier keyword extraction for text-search fallback.
//!
//! When a patch cannot be embedded the retriever degrades to a keyword
//! query; this module picks the identifiers worth searching for.

use std::collections::HashSet;

use tracing::debug;

const MAX_KEYWORDS: usize = 10;

/// Language keywords and primitive type names not worth querying for.
const RESERVED: &[&str] = &[
    "if", "else", "for", "while", "loop", "return", "func", "fn", "function", "var", "let",
    "const", "type", "struct", "enum", "interface", "trait", "impl", "package", "import", "use",
    "mod", "map", "chan", "go", "select", "case", "default", "switch", "match", "break",
    "continue", "goto", "defer", "range", "pub", "mut", "self", "this", "true", "false", "nil",
    "null", "none", "int", "string", "str", "bool", "float", "byte", "error",
];

/// Extracts up to [`MAX_KEYWORDS`] lowercase identifiers from a code
/// fragment, skipping comments, string literals, reserved words and
/// identifiers of length ≤ 2.
pub fn extract_keywords(code: &str) -> Vec<String> {
    let stripped = strip_comments_and_strings(code);

    let mut seen = HashSet::new();
    let mut keywords = Vec::new();
    for token in tokens(&stripped) {
        if token.len() <= 2 || RESERVED.contains(&token.to_lowercase().as_str()) {
            continue;
        }
        let lower = token.to_lowercase();
        if seen.insert(lower.clone()) {
            keywords.push(lower);
            if keywords.len() >= MAX_KEYWORDS {
                break;
            }
        }
    }

    debug!("extracted keywords: {keywords:?}");
    keywords
}

/// Replaces line comments, block comments and double-quoted string literals
/// with spaces so their contents never become keywords.
fn strip_comments_and_strings(code: &str) -> String {
    let bytes = code.as_bytes();
    let mut out = String::with_capacity(code.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
                out.push(' ');
            }
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i = (i + 1).min(bytes.len());
                out.push(' ');
            }
            b => {
                out.push(b as char);
                i += 1;
            }
        }
    }
    out
}

/// Identifier tokens: an ASCII letter followed by letters, digits or `_`.
fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(|t| t.chars().next().is_some_and(|c| c.is_ascii_alphabetic()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_words_and_short_identifiers_are_dropped() {
        let code = "fn compute_checksum(db: &Database) -> u64 { if db.ok { 0 } else { 1 } }";
        let keywords = extract_keywords(code);
        assert!(keywords.contains(&"compute_checksum".to_string()));
        assert!(keywords.contains(&"database".to_string()));
        assert!(!keywords.contains(&"fn".to_string()));
        assert!(!keywords.contains(&"if".to_string()));
        assert!(!keywords.contains(&"db".to_string()));
    }

    #[test]
    fn comments_and_strings_do_not_contribute() {
        let code = r#"
            // commented_identifier should vanish
            /* another_hidden one */
            let message = "stringly_identifier";
            let visible_name = 1;
        "#;
        let keywords = extract_keywords(code);
        assert!(keywords.contains(&"visible_name".to_string()));
        assert!(keywords.contains(&"message".to_string()));
        assert!(!keywords.contains(&"commented_identifier".to_string()));
        assert!(!keywords.contains(&"another_hidden".to_string()));
        assert!(!keywords.contains(&"stringly_identifier".to_string()));
    }

    #[test]
    fn keywords_are_deduplicated_and_capped() {
        let mut code = String::new();
        for i in 0..30 {
            code.push_str(&format!("identifier_number_{i} identifier_number_{i} "));
        }
        let keywords = extract_keywords(&code);
        assert_eq!(keywords.len(), 10);
        let unique: std::collections::HashSet<_> = keywords.iter().collect();
        assert_eq!(unique.len(), keywords.len());
    }
}
