//! Patch enrichment: prepends retrieved context blocks to a patch so the
//! reviewing model sees how the change relates to the rest of the tree.

use std::fmt::Write as _;

use tracing::debug;

use crate::CodeContext;

/// Emits the enriched patch document. Each section is omitted entirely when
/// its context is empty; the original patch always follows unmodified.
pub fn enrich_patch_with_context(patch: &str, context: &CodeContext) -> String {
    if context.is_empty() {
        debug!("no code context available for enrichment");
        return patch.to_string();
    }

    let mut enriched = String::new();

    if !context.imports.is_empty() {
        enriched.push_str("/* Relevant imports:\n");
        for import in &context.imports {
            enriched.push_str(import);
            enriched.push('\n');
        }
        enriched.push_str("*/\n\n");
    }

    if !context.definitions.is_empty() {
        enriched.push_str("/* Relevant definitions:\n");
        for (name, definition) in &context.definitions {
            let _ = writeln!(enriched, "// {name}\n{definition}\n");
        }
        enriched.push_str("*/\n\n");
    }

    if !context.references.is_empty() {
        enriched.push_str("/* Relevant references:\n");
        for reference in &context.references {
            enriched.push_str(reference);
            enriched.push('\n');
        }
        enriched.push_str("*/\n\n");
    }

    if !context.dependencies.is_empty() {
        enriched.push_str("/* Dependencies:\n");
        for dependency in &context.dependencies {
            enriched.push_str(dependency);
            enriched.push('\n');
        }
        enriched.push_str("*/\n\n");
    }

    if !context.similar.is_empty() {
        enriched.push_str("/* Similar code patterns:\n");
        for snippet in &context.similar {
            let _ = writeln!(
                enriched,
                "From {} (lines {}-{}, similarity: {:.2}):\n{}\n",
                snippet.filename,
                snippet.line_start,
                snippet.line_end,
                snippet.similarity,
                snippet.content
            );
        }
        enriched.push_str("*/\n\n");
    }

    enriched.push_str(patch);
    debug!(
        "patch enriched: {} -> {} bytes",
        patch.len(),
        enriched.len()
    );
    enriched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CodeSnippet;

    #[test]
    fn empty_context_returns_the_patch_unchanged() {
        let ctx = CodeContext::default();
        assert_eq!(enrich_patch_with_context("@@ -1 +1 @@", &ctx), "@@ -1 +1 @@");
    }

    #[test]
    fn sections_render_only_when_populated() {
        let mut ctx = CodeContext::default();
        ctx.imports.push("serde: use serde::Serialize;".into());
        ctx.similar.push(CodeSnippet {
            filename: "src/old.rs".into(),
            content: "fn old() {}".into(),
            similarity: 0.8512,
            line_start: 3,
            line_end: 5,
        });

        let out = enrich_patch_with_context("PATCH", &ctx);
        assert!(out.contains("/* Relevant imports:\nserde: use serde::Serialize;\n*/"));
        assert!(out.contains("From src/old.rs (lines 3-5, similarity: 0.85):"));
        assert!(!out.contains("Relevant definitions"));
        assert!(!out.contains("Dependencies"));
        assert!(out.ends_with("PATCH"));
    }

    #[test]
    fn definitions_render_name_then_signature() {
        let mut ctx = CodeContext::default();
        ctx.definitions
            .insert("parse".into(), "fn parse(input: &str) -> Ast".into());
        let out = enrich_patch_with_context("P", &ctx);
        assert!(out.contains("// parse\nfn parse(input: &str) -> Ast"));
    }
}
