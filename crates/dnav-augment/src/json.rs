//! Lenient JSON extraction from model output.
//!
//! Parsing is a small state machine: direct parse, then the outermost
//! `{...}`/`[...]` span, and otherwise the caller gets `NeedsRepair` and may
//! spend its single repair call.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(Value),
    /// Not parseable as-is; holds the raw text to send back for repair.
    NeedsRepair(String),
    Failed(String),
}

/// Try to read one JSON document out of `raw`.
pub fn parse_model_json(raw: &str) -> ParseOutcome {
    let text = strip_code_fence(raw.trim());
    if text.is_empty() {
        return ParseOutcome::Failed("empty response".into());
    }
    if let Ok(v) = serde_json::from_str::<Value>(text) {
        return ParseOutcome::Parsed(v);
    }
    if let Some(span) = outer_span(text) {
        if let Ok(v) = serde_json::from_str::<Value>(span) {
            return ParseOutcome::Parsed(v);
        }
    }
    ParseOutcome::NeedsRepair(raw.to_string())
}

/// Parse the output of the repair call. There is no second repair.
pub fn parse_repaired(raw: &str) -> ParseOutcome {
    match parse_model_json(raw) {
        ParseOutcome::NeedsRepair(_) => ParseOutcome::Failed("repair output is not valid JSON".into()),
        other => other,
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// From the first `{` or `[` to the matching last `}` or `]`.
fn outer_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_parse() {
        match parse_model_json(r#"{"candidates": []}"#) {
            ParseOutcome::Parsed(v) => assert!(v["candidates"].is_array()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_prose_wrapped_object() {
        let raw = "Here is the JSON you asked for:\n{\"candidates\": [{\"title\": \"Launch Semi\"}]}\nLet me know!";
        match parse_model_json(raw) {
            ParseOutcome::Parsed(v) => assert_eq!(v["candidates"][0]["title"], "Launch Semi"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_code_fence() {
        let raw = "```json\n{\"drop_ids\": [\"a\"]}\n```";
        assert!(matches!(parse_model_json(raw), ParseOutcome::Parsed(_)));
    }

    #[test]
    fn test_broken_needs_repair_once() {
        let raw = "{\"candidates\": [{\"title\": \"Launch Semi\",}";
        assert_eq!(parse_model_json(raw), ParseOutcome::NeedsRepair(raw.to_string()));
        assert!(matches!(parse_repaired(raw), ParseOutcome::Failed(_)));
    }

    #[test]
    fn test_empty_fails() {
        assert!(matches!(parse_model_json("   "), ParseOutcome::Failed(_)));
    }
}
