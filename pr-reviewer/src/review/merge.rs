//! Verdict merging: combines per-chunk verdicts into one review result.
//!
//! Aggregate `lgtm` is the AND over all verdicts; an empty set merges to
//! the neutral LGTM-true verdict. With more than one chunk the string
//! fields join under `chunk i/N` headers and the review comments carry
//! `\n\n---\n\n` separators between chunks.

use crate::review::prompt::Language;
use crate::review::verdict::Verdict;

/// Merges verdicts ordered by chunk index.
pub fn merge_verdicts(results: &[Verdict], language: Language) -> Verdict {
    if results.is_empty() {
        return Verdict::neutral();
    }
    if results.len() == 1 {
        return results[0].clone();
    }

    let total = results.len();
    let lgtm = results.iter().all(|r| r.lgtm);

    let mut comments = Vec::with_capacity(total);
    let mut summaries = Vec::new();
    let mut suggestions = Vec::new();
    let mut highlights = Vec::new();
    let mut risks = Vec::new();

    for (i, result) in results.iter().enumerate() {
        let n = i + 1;
        comments.push(format!(
            "{}\n\n{}",
            comment_header(n, total, language),
            result.review_comment
        ));
        if !result.summary.is_empty() {
            summaries.push(labeled(n, total, &result.summary, language));
        }
        if !result.suggestions.is_empty() {
            suggestions.push(labeled(n, total, &result.suggestions, language));
        }
        if !result.highlights.is_empty() {
            highlights.push(labeled(n, total, &result.highlights, language));
        }
        if !result.risks.is_empty() {
            risks.push(labeled(n, total, &result.risks, language));
        }
    }

    Verdict {
        lgtm,
        review_comment: comments.join("\n\n---\n\n"),
        summary: summaries.join("\n\n"),
        suggestions: suggestions.join("\n\n"),
        highlights: highlights.join("\n\n"),
        risks: risks.join("\n\n"),
    }
}

fn comment_header(index: usize, total: usize, language: Language) -> String {
    match language {
        Language::English => format!("### chunk {index}/{total} review:"),
        Language::Chinese => format!("### 代码块 {index}/{total} 审查结果:"),
    }
}

fn labeled(index: usize, total: usize, text: &str, language: Language) -> String {
    match language {
        Language::English => format!("**chunk {index}/{total}**: {text}"),
        Language::Chinese => format!("**块 {index}/{total}**: {text}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(lgtm: bool, comment: &str, suggestions: &str) -> Verdict {
        Verdict {
            lgtm,
            review_comment: comment.to_string(),
            summary: format!("summary of {comment}"),
            suggestions: suggestions.to_string(),
            highlights: String::new(),
            risks: String::new(),
        }
    }

    #[test]
    fn empty_set_merges_to_lgtm_true() {
        let merged = merge_verdicts(&[], Language::English);
        assert!(merged.lgtm);
        assert!(merged.review_comment.is_empty());
    }

    #[test]
    fn single_verdict_passes_through_unlabeled() {
        let v = verdict(false, "needs work", "split the function");
        let merged = merge_verdicts(&[v.clone()], Language::English);
        assert_eq!(merged, v);
        assert!(!merged.review_comment.contains("chunk 1/1"));
    }

    #[test]
    fn aggregate_lgtm_is_the_and_over_chunks() {
        let all_good = vec![verdict(true, "a", ""), verdict(true, "b", "")];
        assert!(merge_verdicts(&all_good, Language::English).lgtm);

        let one_bad = vec![verdict(true, "a", ""), verdict(false, "b", "fix")];
        assert!(!merge_verdicts(&one_bad, Language::English).lgtm);
    }

    #[test]
    fn multi_chunk_merge_labels_segments_and_separates_comments() {
        let results = vec![
            verdict(true, "first part fine", "tidy imports"),
            verdict(true, "second part fine", "add tests"),
            verdict(true, "third part fine", "rename variable"),
        ];
        let merged = merge_verdicts(&results, Language::English);

        assert!(merged.lgtm);
        assert!(merged.review_comment.contains("chunk 1/3"));
        assert!(merged.review_comment.contains("chunk 2/3"));
        assert!(merged.review_comment.contains("chunk 3/3"));
        assert_eq!(merged.review_comment.matches("\n\n---\n\n").count(), 2);

        assert!(merged.suggestions.contains("**chunk 1/3**: tidy imports"));
        assert!(merged.suggestions.contains("**chunk 3/3**: rename variable"));
    }

    #[test]
    fn empty_fields_are_skipped_in_labeled_sections() {
        let results = vec![verdict(true, "a", "fix"), verdict(true, "b", "")];
        let merged = merge_verdicts(&results, Language::English);
        assert!(merged.suggestions.contains("chunk 1/2"));
        assert!(!merged.suggestions.contains("chunk 2/2"));
    }

    #[test]
    fn chinese_labels_use_the_localized_wording() {
        let results = vec![verdict(true, "a", "x"), verdict(true, "b", "y")];
        let merged = merge_verdicts(&results, Language::Chinese);
        assert!(merged.review_comment.contains("### 代码块 1/2 审查结果:"));
        assert!(merged.suggestions.contains("**块 1/2**: x"));
    }
}
