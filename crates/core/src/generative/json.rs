//! Tolerant extraction of JSON objects from free-text completions.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::GenerativeError;

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*\})\s*```").unwrap()
});

/// Pull the JSON object out of a model response.
///
/// Models wrap answers in markdown fences or surround them with prose. A
/// fenced block wins; otherwise everything from the first `{` to the last `}`
/// is taken. Whether the slice is valid JSON is left to the caller's parser.
pub fn extract_json_block(text: &str) -> Result<&str, GenerativeError> {
    if let Some(block) = FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        return Ok(block.as_str());
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&text[start..=end]),
        _ => Err(GenerativeError::Json(format!(
            "no JSON object in response: {}",
            truncate(text, 120)
        ))),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        let text = r#"{"title": "Summer Launch"}"#;
        assert_eq!(extract_json_block(text).unwrap(), text);
    }

    #[test]
    fn test_fenced_block() {
        let text = "Here is the plan:\n```json\n{\"title\": \"Launch\", \"nested\": {\"a\": 1}}\n```\nGood luck!";
        assert_eq!(
            extract_json_block(text).unwrap(),
            "{\"title\": \"Launch\", \"nested\": {\"a\": 1}}"
        );
    }

    #[test]
    fn test_prose_around_object() {
        let text = "Sure! {\"score\": 82} Let me know if you need more.";
        assert_eq!(extract_json_block(text).unwrap(), "{\"score\": 82}");
    }

    #[test]
    fn test_no_object() {
        let err = extract_json_block("I cannot help with that.").unwrap_err();
        assert!(matches!(err, GenerativeError::Json(_)));
    }

    #[test]
    fn test_reversed_braces() {
        assert!(extract_json_block("} nothing here {").is_err());
    }

    #[test]
    fn test_truncate_multibyte() {
        let long = "é".repeat(200);
        let short = truncate(&long, 10);
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), 13);
    }
}
