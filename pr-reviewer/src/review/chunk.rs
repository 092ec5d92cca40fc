//! Token-bounded patch chunking.
//!
//! Policy: estimate tokens as `⌈chars/4⌉`; small patches pass through as a
//! single chunk. Oversized patches split at `diff --git` boundaries (the
//! marker stays on every segment) and segments pack greedily into chunks.
//! A single file larger than the budget splits by lines with terminators
//! preserved, so in-order concatenation of chunk bodies reproduces the
//! input exactly.

/// One token-bounded slice of a unified diff.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 1-based position among the siblings.
    pub index: usize,
    /// Identical across siblings.
    pub total: usize,
    pub body: String,
    pub approx_tokens: usize,
}

/// Rough token estimate: 4 characters ≈ 1 token, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Splits a patch into chunks of at most `max_tokens` estimated tokens.
pub fn split_patch(patch: &str, max_tokens: usize) -> Vec<Chunk> {
    if patch.is_empty() {
        return Vec::new();
    }
    if max_tokens == 0 || estimate_tokens(patch) <= max_tokens {
        return finish(vec![patch.to_string()]);
    }

    let mut bodies: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0usize;

    for segment in split_at_file_boundaries(patch) {
        let segment_tokens = estimate_tokens(segment);

        if segment_tokens > max_tokens {
            // A single file exceeds the budget: flush, then split by lines.
            if !current.is_empty() {
                bodies.push(std::mem::take(&mut current));
                current_tokens = 0;
            }
            split_lines_into(segment, max_tokens, &mut bodies);
            continue;
        }

        if !current.is_empty() && current_tokens + segment_tokens > max_tokens {
            bodies.push(std::mem::take(&mut current));
            current_tokens = 0;
        }
        current.push_str(segment);
        current_tokens += segment_tokens;
    }
    if !current.is_empty() {
        bodies.push(current);
    }

    finish(bodies)
}

/// Segments of the patch, one per `diff --git` section. A preamble before
/// the first marker (or a patch without markers) forms its own segment, so
/// concatenating all segments reproduces the input byte-for-byte.
fn split_at_file_boundaries(patch: &str) -> Vec<&str> {
    const MARKER: &str = "diff --git";

    let mut starts: Vec<usize> = patch.match_indices(MARKER).map(|(i, _)| i).collect();
    if starts.first() != Some(&0) {
        starts.insert(0, 0);
    }
    starts.push(patch.len());

    starts
        .windows(2)
        .map(|w| &patch[w[0]..w[1]])
        .filter(|s| !s.is_empty())
        .collect()
}

/// Greedy line packing with terminators preserved.
fn split_lines_into(segment: &str, max_tokens: usize, bodies: &mut Vec<String>) {
    let mut current = String::new();
    let mut current_tokens = 0usize;

    for line in segment.split_inclusive('\n') {
        let line_tokens = estimate_tokens(line);
        if !current.is_empty() && current_tokens + line_tokens > max_tokens {
            bodies.push(std::mem::take(&mut current));
            current_tokens = 0;
        }
        current.push_str(line);
        current_tokens += line_tokens;
    }
    if !current.is_empty() {
        bodies.push(current);
    }
}

fn finish(bodies: Vec<String>) -> Vec<Chunk> {
    let total = bodies.len();
    bodies
        .into_iter()
        .enumerate()
        .map(|(i, body)| {
            let approx_tokens = estimate_tokens(&body);
            Chunk {
                index: i + 1,
                total,
                body,
                approx_tokens,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_section(name: &str, lines: usize) -> String {
        let mut s = format!("diff --git a/{name} b/{name}\n@@ -1 +1 @@\n");
        for i in 0..lines {
            s.push_str(&format!("+line {i} of {name}\n"));
        }
        s
    }

    #[test]
    fn small_patches_pass_through_as_one_chunk() {
        let patch = file_section("a.rs", 3);
        let chunks = split_patch(&patch, 4000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 1);
        assert_eq!(chunks[0].total, 1);
        assert_eq!(chunks[0].body, patch);
    }

    #[test]
    fn concatenation_reproduces_the_input() {
        let patch = format!(
            "{}{}{}",
            file_section("a.rs", 40),
            file_section("b.rs", 40),
            file_section("c.rs", 40)
        );
        let chunks = split_patch(&patch, 200);
        assert!(chunks.len() > 1);

        let rejoined: String = chunks.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(rejoined, patch);
    }

    #[test]
    fn every_file_chunk_keeps_its_marker() {
        let patch = format!("{}{}", file_section("a.rs", 40), file_section("b.rs", 40));
        let chunks = split_patch(&patch, 300);
        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert!(chunk.body.starts_with("diff --git"));
        }
    }

    #[test]
    fn indices_and_totals_are_consistent() {
        let patch = format!(
            "{}{}{}",
            file_section("a.rs", 40),
            file_section("b.rs", 40),
            file_section("c.rs", 40)
        );
        let chunks = split_patch(&patch, 200);
        let total = chunks.len();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i + 1);
            assert_eq!(chunk.total, total);
            assert!(chunk.approx_tokens <= 200);
        }
    }

    #[test]
    fn oversized_single_file_splits_by_lines_losslessly() {
        let patch = file_section("huge.rs", 400);
        let chunks = split_patch(&patch, 100);
        assert!(chunks.len() > 1);

        let rejoined: String = chunks.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(rejoined, patch);
    }

    #[test]
    fn patch_without_markers_still_chunks() {
        let patch = "+just lines\n".repeat(200);
        let chunks = split_patch(&patch, 50);
        assert!(chunks.len() > 1);
        let rejoined: String = chunks.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(rejoined, patch);
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
