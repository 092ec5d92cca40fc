//! Structured LLM verdicts and their tolerant parser.
//!
//! Models wrap their JSON in various shapes; the parser accepts the
//! canonical object, one level of `{value|data|input|result}` wrapping, and
//! a brace-scan fallback for responses with prose around the object. A body
//! that survives none of these is discarded and the chunk contributes a
//! neutral verdict, so the review never fails closed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wrapper keys unwrapped one level before canonical parsing.
const WRAPPER_KEYS: &[&str] = &["value", "data", "input", "result"];

/// Field names that make an object recognizable as a verdict.
const VERDICT_KEYS: &[&str] = &[
    "lgtm",
    "review_comment",
    "summary",
    "suggestions",
    "highlights",
    "risks",
];

/// Structured review result for one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(default)]
    pub lgtm: bool,
    #[serde(default)]
    pub review_comment: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub suggestions: String,
    #[serde(default)]
    pub highlights: String,
    #[serde(default)]
    pub risks: String,
}

impl Verdict {
    /// Fallback verdict for chunks that could not be reviewed: LGTM with
    /// every string empty.
    pub fn neutral() -> Self {
        Self {
            lgtm: true,
            review_comment: String::new(),
            summary: String::new(),
            suggestions: String::new(),
            highlights: String::new(),
            risks: String::new(),
        }
    }

    /// True when the verdict carries no actionable content.
    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty() && self.risks.is_empty()
    }
}

/// Parses a model response into a verdict.
///
/// Returns `None` when no recognizable verdict object can be recovered;
/// the caller substitutes [`Verdict::neutral`] and logs the raw body.
pub fn parse_verdict(content: &str) -> Option<Verdict> {
    if let Some(verdict) = try_parse(content) {
        return Some(verdict);
    }

    // Some models surround the object with prose: slice from the first `{`
    // to the last `}` and retry.
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    try_parse(&content[start..=end])
}

fn try_parse(text: &str) -> Option<Verdict> {
    let value: Value = serde_json::from_str(text).ok()?;
    let object = unwrap_one_level(&value)?;

    // Reject arbitrary objects: at least one canonical field must appear.
    if !VERDICT_KEYS.iter().any(|k| object.contains_key(*k)) {
        return None;
    }
    serde_json::from_value(Value::Object(object.clone())).ok()
}

/// Returns the canonical verdict object, unwrapping one wrapper level when
/// present.
fn unwrap_one_level(value: &Value) -> Option<&serde_json::Map<String, Value>> {
    let object = value.as_object()?;
    for key in WRAPPER_KEYS {
        if let Some(inner) = object.get(*key).and_then(Value::as_object) {
            return Some(inner);
        }
    }
    Some(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: &str = r#"{
        "lgtm": false,
        "review_comment": "x",
        "summary": "s",
        "suggestions": "do better",
        "highlights": "h",
        "risks": "r"
    }"#;

    #[test]
    fn canonical_objects_parse_directly() {
        let v = parse_verdict(CANONICAL).expect("verdict");
        assert!(!v.lgtm);
        assert_eq!(v.review_comment, "x");
        assert_eq!(v.suggestions, "do better");
    }

    #[test]
    fn wrapper_shapes_unwrap_one_level() {
        for key in ["value", "data", "input", "result"] {
            let wrapped = format!(r#"{{"{key}": {CANONICAL}}}"#);
            let v = parse_verdict(&wrapped).expect("verdict");
            assert!(!v.lgtm, "wrapper {key} must unwrap");
            assert_eq!(v.review_comment, "x");
        }
    }

    #[test]
    fn prose_around_the_object_is_sliced_away() {
        let noisy = format!("Sure! Here is my review:\n{CANONICAL}\nHope this helps.");
        let v = parse_verdict(&noisy).expect("verdict");
        assert!(!v.lgtm);
    }

    #[test]
    fn missing_fields_default() {
        let v = parse_verdict(r#"{"lgtm": true}"#).expect("verdict");
        assert!(v.lgtm);
        assert!(v.review_comment.is_empty());
        assert!(v.is_empty());
    }

    #[test]
    fn unrecognizable_bodies_are_discarded() {
        assert_eq!(parse_verdict("not json at all"), None);
        assert_eq!(parse_verdict(r#"{"unrelated": 1}"#), None);
        assert_eq!(parse_verdict(r#"[1, 2, 3]"#), None);
        assert_eq!(parse_verdict(""), None);
    }

    #[test]
    fn neutral_verdict_is_lgtm_with_empty_strings() {
        let v = Verdict::neutral();
        assert!(v.lgtm);
        assert!(v.is_empty());
        assert!(v.review_comment.is_empty());
    }
}
