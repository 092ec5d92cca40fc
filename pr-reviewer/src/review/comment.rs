//! Review rendering: per-file comments and the top-level review body,
//! localized per the configured language.

use crate::review::prompt::Language;
use crate::review::verdict::Verdict;

/// Rendered review for one file, tracked for the top-level summary.
#[derive(Debug, Clone)]
pub struct FileReview {
    pub path: String,
    pub lgtm: bool,
}

/// Comment anchor: last line of the original (un-enriched) patch.
pub fn position_for(patch: &str) -> i64 {
    patch.split('\n').count() as i64 - 1
}

/// Renders the per-file comment body.
///
/// A file shows "changes required" only when the verdict is negative and
/// carries content (suggestions or risks); a negative verdict with nothing
/// actionable still reads as LGTM.
pub fn build_file_comment(verdict: &Verdict, language: Language) -> String {
    let changes_required = !verdict.lgtm && !verdict.is_empty();

    let mut body = String::new();
    body.push_str(match (changes_required, language) {
        (true, Language::English) => "**LGTM: ✖️ Changes Required**\n\n",
        (true, Language::Chinese) => "**LGTM: ✖️ 需要修改**\n\n",
        (false, Language::English) => "**LGTM: ✅ Code Looks Good**\n\n",
        (false, Language::Chinese) => "**LGTM: ✅ 代码看起来不错**\n\n",
    });

    if !verdict.summary.is_empty() {
        let heading = match language {
            Language::English => "## Summary",
            Language::Chinese => "## 总结",
        };
        body.push_str(&format!("{heading}\n{}\n\n", verdict.summary));
    }
    if !verdict.review_comment.is_empty() {
        let heading = match language {
            Language::English => "## Detailed Comments",
            Language::Chinese => "## 详细评论",
        };
        body.push_str(&format!("{heading}\n{}\n\n", verdict.review_comment));
    }
    if !verdict.suggestions.is_empty() {
        let heading = match language {
            Language::English => "## Suggestions",
            Language::Chinese => "## 改进建议",
        };
        body.push_str(&format!("{heading}\n{}\n\n", verdict.suggestions));
    }
    if !verdict.risks.is_empty() {
        let label = match language {
            Language::English => "**Potential Risks**",
            Language::Chinese => "**潜在风险**",
        };
        body.push_str(&format!("{label}: {}\n\n", verdict.risks));
    }
    body
}

/// Renders the top-level review body with per-file ✅/❌ bullets.
pub fn build_review_body(reviews: &[FileReview], language: Language) -> String {
    let all_lgtm = reviews.iter().all(|r| r.lgtm);

    let mut body = String::from(match (reviews.is_empty(), all_lgtm, language) {
        (true, _, Language::English) => {
            "## Code review ℹ️\n\nNo reviewable files were found. They may all be filtered out or the change is too small."
        }
        (true, _, Language::Chinese) => {
            "## 代码审查结果 ℹ️\n\n没有发现需要审查的文件。这可能是因为所有文件都被过滤或者变更太小。"
        }
        (false, true, Language::English) => {
            "## Code review completed ✅\n\nAll files passed review; see the per-file comments for details."
        }
        (false, true, Language::Chinese) => {
            "## 代码审查通过 ✅\n\n所有文件都通过了审查，请查看各文件的详细评论获取更多信息。"
        }
        (false, false, Language::English) => {
            "## Code review found issues ⚠️\n\nSome files need changes; see the per-file comments for details."
        }
        (false, false, Language::Chinese) => {
            "## 代码审查发现问题 ⚠️\n\n一些文件需要修改，请查看各文件的详细评论获取更多信息。"
        }
    });

    if !reviews.is_empty() {
        let heading = match language {
            Language::English => "\n\n### File summary:\n",
            Language::Chinese => "\n\n### 文件摘要:\n",
        };
        body.push_str(heading);
        let bullets: Vec<String> = reviews
            .iter()
            .map(|r| {
                let name = file_name(&r.path);
                match (r.lgtm, language) {
                    (true, Language::English) => format!("✅ `{name}` looks good"),
                    (true, Language::Chinese) => format!("✅ `{name}` 看起来不错"),
                    (false, Language::English) => format!("❌ `{name}` needs changes"),
                    (false, Language::Chinese) => format!("❌ `{name}` 需要修改"),
                }
            })
            .collect();
        body.push_str(&bullets.join("\n"));
    }

    body.push_str(match language {
        Language::English => "\n\n---\n*Generated automatically by the AI code review assistant*",
        Language::Chinese => "\n\n---\n*由 AI 代码审查助手自动生成*",
    });
    body
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
