//! Line-level import and definition extraction used at indexing time.
//!
//! Indexed files get companion snippet rows for their import statements
//! (metadata `type=import` with the imported `package`) and their top-level
//! symbol definitions (`symbol_name`/`symbol_type`), which is what the
//! context retriever filters on. The extraction is deliberately shallow:
//! one pass over the lines, no parsing.

/// One import statement of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportLine {
    /// Imported package or crate name.
    pub package: String,
    /// The statement as written.
    pub statement: String,
    /// 1-based source line.
    pub line: usize,
}

/// One top-level symbol definition of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionLine {
    pub name: String,
    /// Symbol kind: "function", "type", "struct", "interface", "class".
    pub kind: &'static str,
    /// The signature line as written.
    pub signature: String,
    /// 1-based source line.
    pub line: usize,
}

/// Extracts import statements for the supported languages.
pub fn extract_imports(content: &str, language: &str) -> Vec<ImportLine> {
    let mut imports = Vec::new();
    let mut in_go_block = false;

    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim();
        let n = i + 1;
        match language {
            "go" => {
                if line.starts_with("import (") {
                    in_go_block = true;
                    continue;
                }
                if in_go_block {
                    if line == ")" {
                        in_go_block = false;
                    } else if let Some(package) = quoted_package(line) {
                        imports.push(ImportLine {
                            package,
                            statement: format!("import {line}"),
                            line: n,
                        });
                    }
                    continue;
                }
                if line.starts_with("import ") {
                    if let Some(package) = quoted_package(line) {
                        imports.push(ImportLine {
                            package,
                            statement: line.to_string(),
                            line: n,
                        });
                    }
                }
            }
            "javascript" => {
                if line.starts_with("import ") || line.contains("require(") {
                    if let Some(package) = js_package(line) {
                        imports.push(ImportLine {
                            package,
                            statement: line.to_string(),
                            line: n,
                        });
                    }
                }
            }
            "python" => {
                if let Some(rest) = line.strip_prefix("import ") {
                    let package = rest.split([' ', '.', ',']).next().unwrap_or(rest);
                    imports.push(ImportLine {
                        package: package.to_string(),
                        statement: line.to_string(),
                        line: n,
                    });
                } else if let Some(rest) = line.strip_prefix("from ") {
                    let package = rest.split([' ', '.']).next().unwrap_or(rest);
                    imports.push(ImportLine {
                        package: package.to_string(),
                        statement: line.to_string(),
                        line: n,
                    });
                }
            }
            "rust" => {
                if let Some(rest) = line.strip_prefix("use ").or_else(|| {
                    line.strip_prefix("pub use ")
                }) {
                    let package = rest
                        .split(|c: char| c == ':' || c == ';' || c == '{' || c == ' ')
                        .next()
                        .unwrap_or(rest);
                    if !package.is_empty() {
                        imports.push(ImportLine {
                            package: package.to_string(),
                            statement: line.to_string(),
                            line: n,
                        });
                    }
                }
            }
            _ => {}
        }
    }
    imports
}

/// Extracts top-level symbol definitions for the supported languages.
pub fn extract_definitions(content: &str, language: &str) -> Vec<DefinitionLine> {
    let mut definitions = Vec::new();

    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim_end();
        let trimmed = line.trim_start();
        let n = i + 1;

        let found = match language {
            "go" => go_definition(trimmed),
            "javascript" => js_definition(trimmed),
            "python" => python_definition(trimmed),
            "rust" => rust_definition(trimmed),
            _ => None,
        };
        if let Some((name, kind)) = found {
            definitions.push(DefinitionLine {
                name,
                kind,
                signature: trimmed.to_string(),
                line: n,
            });
        }
    }
    definitions
}

fn quoted_package(line: &str) -> Option<String> {
    let start = line.find('"')?;
    let end = line[start + 1..].find('"')? + start + 1;
    let path = &line[start + 1..end];
    Some(path.rsplit('/').next().unwrap_or(path).to_string())
}

fn js_package(line: &str) -> Option<String> {
    let quote = line.find(['\'', '"'])?;
    let q = line.as_bytes()[quote] as char;
    let rest = &line[quote + 1..];
    let end = rest.find(q)?;
    Some(rest[..end].to_string())
}

fn go_definition(line: &str) -> Option<(String, &'static str)> {
    if let Some(rest) = line.strip_prefix("func ") {
        // Methods carry a receiver: `func (r *T) Name(...)`.
        let rest = match rest.strip_prefix('(') {
            Some(after) => after.split_once(')').map(|(_, r)| r.trim_start())?,
            None => rest,
        };
        let name = identifier_prefix(rest)?;
        return Some((name, "function"));
    }
    if let Some(rest) = line.strip_prefix("type ") {
        let name = identifier_prefix(rest)?;
        let kind = if rest.contains("interface") {
            "interface"
        } else if rest.contains("struct") {
            "struct"
        } else {
            "type"
        };
        return Some((name, kind));
    }
    None
}

fn js_definition(line: &str) -> Option<(String, &'static str)> {
    if let Some(rest) = line
        .strip_prefix("function ")
        .or_else(|| line.strip_prefix("export function "))
    {
        return Some((identifier_prefix(rest)?, "function"));
    }
    if let Some(rest) = line
        .strip_prefix("class ")
        .or_else(|| line.strip_prefix("export class "))
    {
        return Some((identifier_prefix(rest)?, "class"));
    }
    None
}

fn python_definition(line: &str) -> Option<(String, &'static str)> {
    if let Some(rest) = line.strip_prefix("def ") {
        return Some((identifier_prefix(rest)?, "function"));
    }
    if let Some(rest) = line.strip_prefix("class ") {
        return Some((identifier_prefix(rest)?, "class"));
    }
    None
}

fn rust_definition(line: &str) -> Option<(String, &'static str)> {
    let line = line.strip_prefix("pub ").unwrap_or(line);
    let line = line.strip_prefix("async ").unwrap_or(line);
    if let Some(rest) = line.strip_prefix("fn ") {
        return Some((identifier_prefix(rest)?, "function"));
    }
    if let Some(rest) = line.strip_prefix("struct ") {
        return Some((identifier_prefix(rest)?, "struct"));
    }
    if let Some(rest) = line.strip_prefix("enum ") {
        return Some((identifier_prefix(rest)?, "type"));
    }
    if let Some(rest) = line.strip_prefix("trait ") {
        return Some((identifier_prefix(rest)?, "interface"));
    }
    None
}

/// Leading identifier of a declaration remainder, e.g. `parse(input: …`.
fn identifier_prefix(rest: &str) -> Option<String> {
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go_import_blocks_and_single_imports() {
        let content = r#"package main

import (
    "fmt"
    "net/http"
)

import "strings"
"#;
        let imports = extract_imports(content, "go");
        let packages: Vec<_> = imports.iter().map(|i| i.package.as_str()).collect();
        assert_eq!(packages, vec!["fmt", "http", "strings"]);
    }

    #[test]
    fn rust_use_statements_yield_crate_names() {
        let content = "use serde::Deserialize;\npub use tokio::sync::mpsc;\nfn main() {}\n";
        let imports = extract_imports(content, "rust");
        let packages: Vec<_> = imports.iter().map(|i| i.package.as_str()).collect();
        assert_eq!(packages, vec!["serde", "tokio"]);
    }

    #[test]
    fn javascript_and_python_imports() {
        let js = "import { thing } from 'widgets';\nconst fs = require(\"fs\");\n";
        let packages: Vec<_> = extract_imports(js, "javascript")
            .iter()
            .map(|i| i.package.clone())
            .collect();
        assert_eq!(packages, vec!["widgets", "fs"]);

        let py = "import os.path\nfrom collections import deque\n";
        let packages: Vec<_> = extract_imports(py, "python")
            .iter()
            .map(|i| i.package.clone())
            .collect();
        assert_eq!(packages, vec!["os", "collections"]);
    }

    #[test]
    fn go_definitions_cover_functions_methods_and_types() {
        let content = "func Parse(s string) {}\nfunc (c *Client) Do() {}\ntype Config struct {}\ntype Reader interface {}\n";
        let defs = extract_definitions(content, "go");
        assert_eq!(defs.len(), 4);
        assert_eq!(defs[0].name, "Parse");
        assert_eq!(defs[0].kind, "function");
        assert_eq!(defs[1].name, "Do");
        assert_eq!(defs[2].kind, "struct");
        assert_eq!(defs[3].kind, "interface");
    }

    #[test]
    fn rust_definitions_include_visibility_prefixes() {
        let content = "pub fn run() {}\npub async fn serve() {}\nstruct Inner;\npub trait Store {}\n";
        let defs = extract_definitions(content, "rust");
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["run", "serve", "Inner", "Store"]);
        assert_eq!(defs[3].kind, "interface");
    }

    #[test]
    fn unknown_languages_extract_nothing() {
        assert!(extract_imports("import x", "text").is_empty());
        assert!(extract_definitions("fn x()", "text").is_empty());
    }
}
