//! Review prompt assembly.
//!
//! The prompt pins the model to exactly one JSON object with the verdict
//! fields, states the reply language imperatively, and labels multi-chunk
//! prompts with their position in the sequence.

use crate::review::chunk::Chunk;

/// Review output language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Chinese,
    English,
}

impl Language {
    /// Parses the configured language; anything but "english" selects
    /// Chinese, the upstream default.
    pub fn from_config(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("english") {
            Self::English
        } else {
            Self::Chinese
        }
    }
}

/// Default review instruction when the `PROMPT` option is unset.
pub const DEFAULT_PROMPT: &str = "Please review the following code patch. Focus on potential bugs, risks, and improvement suggestions.";

/// Prompt inputs shared by all chunks of a review.
#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub base_prompt: String,
    pub language: Language,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            base_prompt: DEFAULT_PROMPT.to_string(),
            language: Language::Chinese,
        }
    }
}

/// Builds the full prompt for one patch (or chunk body).
pub fn build_prompt(cfg: &PromptConfig, patch: &str) -> String {
    let language_instruction = match cfg.language {
        Language::English => {
            "You MUST respond in English. All your feedback, comments, and suggestions should be in English."
        }
        Language::Chinese => "你必须用中文回复。所有的反馈、评论和建议都应该使用中文。",
    };

    let json_format_requirement = format!(
        r#"
{language_instruction}

You MUST provide your feedback in a strict JSON format with the following structure:
{{
  "lgtm": boolean, // true if the code looks good to merge, false if there are concerns
  "review_comment": string, // Your detailed review comments. You can use markdown syntax in this string.
  "summary": string, // A concise summary of the code changes
  "suggestions": string, // Specific suggestions for improvements
  "highlights": string, // Positive aspects or well-implemented parts of the code
  "risks": string // IMPORTANT: Keep this to a SINGLE, SHORT sentence (max 100 chars) describing the most critical risk only
}}

IMPORTANT REQUIREMENTS:
1. Your response MUST be a valid JSON object and NOTHING ELSE.
2. Do NOT include any text before or after the JSON object.
3. All fields MUST be present in your response.
4. NEVER leave any field empty or null. If you have nothing to say for a field, provide a message like "No specific suggestions" or "No risks identified".
5. Provide detailed and specific feedback for each field, with examples from the code where relevant, EXCEPT for the 'risks' field which must be a single, short sentence.
6. Make sure your JSON is properly formatted and can be parsed by a standard JSON parser.

Failure to follow these instructions will result in your review being rejected.
"#
    );

    format!("{}{}\n{}\n", cfg.base_prompt, json_format_requirement, patch)
}

/// Builds the prompt for one chunk, labeling its position when the patch
/// was split.
pub fn build_chunk_prompt(cfg: &PromptConfig, chunk: &Chunk) -> String {
    let prompt = build_prompt(cfg, &chunk.body);
    if chunk.total > 1 {
        format!(
            "This is part {} of {} of a larger code review. Please review only this part:\n\n{prompt}",
            chunk.index, chunk.total
        )
    } else {
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, total: usize) -> Chunk {
        Chunk {
            index,
            total,
            body: "@@ -1 +1 @@\n+x\n".to_string(),
            approx_tokens: 4,
        }
    }

    #[test]
    fn prompt_states_the_language_imperatively() {
        let cfg = PromptConfig {
            base_prompt: "Review this.".into(),
            language: Language::English,
        };
        let p = build_prompt(&cfg, "PATCH");
        assert!(p.starts_with("Review this."));
        assert!(p.contains("You MUST respond in English."));
        assert!(p.contains("\"lgtm\": boolean"));
        assert!(p.ends_with("PATCH\n"));

        let cfg = PromptConfig {
            language: Language::Chinese,
            ..cfg
        };
        assert!(build_prompt(&cfg, "PATCH").contains("你必须用中文回复"));
    }

    #[test]
    fn multi_chunk_prompts_carry_a_part_label() {
        let cfg = PromptConfig::default();
        let p = build_chunk_prompt(&cfg, &chunk(2, 3));
        assert!(p.starts_with("This is part 2 of 3 of a larger code review."));

        let single = build_chunk_prompt(&cfg, &chunk(1, 1));
        assert!(!single.contains("part 1 of 1"));
    }

    #[test]
    fn language_parsing_defaults_to_chinese() {
        assert_eq!(Language::from_config("english"), Language::English);
        assert_eq!(Language::from_config("English"), Language::English);
        assert_eq!(Language::from_config("chinese"), Language::Chinese);
        assert_eq!(Language::from_config(""), Language::Chinese);
    }
}
