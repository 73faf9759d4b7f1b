//! Gateway response parsing
//!
//! Gateways disagree on where the generated text lives. Known layouts are
//! tried in a fixed order; the first one yielding non-blank text wins.
//!
//! # Mathematical Specification
//!
//! ```text
//! Algorithm parse(body, header_tokens):
//! 1. If body is not JSON:
//!      text ← trim(body); Return Parsed(text, header_tokens) if text ≠ ""
//!      Return Unparsed
//! 2. For shape in [Bare, Flat, NestedData, Choices]:
//!      If shape.extract(json) = t and trim(t) ≠ "": Return Parsed(t, usage)
//! 3. If some shape matched a blank string: Return Parsed("", usage)
//! 4. Return Unparsed
//!
//! usage = total_tokens | prompt_tokens + completion_tokens | header_tokens
//! ```

use serde_json::Value;

/// Keys that may hold the text at the top level, in priority order
pub const FLAT_KEYS: [&str; 6] = ["reply", "response", "text", "answer", "result", "completion"];

/// Keys that may hold the text under `data`, in priority order
pub const NESTED_KEYS: [&str; 4] = ["text", "reply", "response", "answer"];

/// Result of parsing one response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Text found (possibly blank) with optional token usage
    Parsed { text: String, usage: Option<u64> },
    /// No known layout matched
    Unparsed,
}

impl ParseOutcome {
    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseOutcome::Parsed { .. })
    }
}

/// A known response layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `"text"`
    Bare,
    /// `{"reply" | "response" | "text" | "answer" | "result" | "completion": "text"}`
    Flat,
    /// `{"data": {"text" | "reply" | "response" | "answer": "text"}}`
    NestedData,
    /// `{"choices": [{"message": {"content": "text"}}]}` or `[{"text": ...}]`
    Choices,
}

/// Parsers in the order they are tried
pub const SHAPES: [ResponseShape; 4] = [
    ResponseShape::Bare,
    ResponseShape::Flat,
    ResponseShape::NestedData,
    ResponseShape::Choices,
];

fn first_string<'a>(object: &'a Value, keys: &[&str]) -> Option<&'a str> {
    let mut blank = None;
    for key in keys {
        if let Some(s) = object.get(*key).and_then(Value::as_str) {
            if !s.trim().is_empty() {
                return Some(s);
            }
            blank.get_or_insert(s);
        }
    }
    blank
}

impl ResponseShape {
    /// Text at this layout's location, if the location exists
    pub fn extract<'a>(&self, json: &'a Value) -> Option<&'a str> {
        match self {
            ResponseShape::Bare => json.as_str(),
            ResponseShape::Flat => first_string(json, &FLAT_KEYS),
            ResponseShape::NestedData => json
                .get("data")
                .filter(|d| d.is_object())
                .and_then(|d| first_string(d, &NESTED_KEYS)),
            ResponseShape::Choices => {
                let first = json.get("choices")?.as_array()?.first()?;
                first
                    .get("message")
                    .and_then(|m| m.get("content"))
                    .and_then(Value::as_str)
                    .or_else(|| first.get("text").and_then(Value::as_str))
            }
        }
    }
}

/// Token usage from a `usage` object
pub fn usage_tokens(json: &Value) -> Option<u64> {
    let usage = json.get("usage")?;
    if let Some(total) = usage.get("total_tokens").and_then(Value::as_u64).filter(|n| *n > 0) {
        return Some(total);
    }
    let prompt = usage.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0);
    let completion = usage.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0);
    Some(prompt.saturating_add(completion)).filter(|n| *n > 0)
}

/// Parse a 2xx body into text and optional token usage
pub fn parse_response(body: &str, header_tokens: Option<u64>) -> ParseOutcome {
    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(_) => {
            let text = body.trim();
            return if text.is_empty() {
                ParseOutcome::Unparsed
            } else {
                ParseOutcome::Parsed {
                    text: text.to_string(),
                    usage: header_tokens,
                }
            };
        }
    };

    let usage = usage_tokens(&json).or(header_tokens);
    let mut blank_match = false;

    for shape in SHAPES {
        if let Some(text) = shape.extract(&json) {
            let text = text.trim();
            if !text.is_empty() {
                return ParseOutcome::Parsed {
                    text: text.to_string(),
                    usage,
                };
            }
            blank_match = true;
        }
    }

    if blank_match {
        ParseOutcome::Parsed {
            text: String::new(),
            usage,
        }
    } else {
        ParseOutcome::Unparsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(outcome: ParseOutcome) -> String {
        match outcome {
            ParseOutcome::Parsed { text, .. } => text,
            ParseOutcome::Unparsed => panic!("expected parsed outcome"),
        }
    }

    #[test]
    fn test_plain_text_body() {
        assert_eq!(text_of(parse_response("  Leave is 24 days.\n", None)), "Leave is 24 days.");
    }

    #[test]
    fn test_json_string_body() {
        assert_eq!(text_of(parse_response("\"quoted\"", None)), "quoted");
    }

    #[test]
    fn test_flat_keys_in_priority_order() {
        let body = r#"{"text": "second", "reply": "first"}"#;
        assert_eq!(text_of(parse_response(body, None)), "first");

        let body = r#"{"reply": "", "completion": "fallback key"}"#;
        assert_eq!(text_of(parse_response(body, None)), "fallback key");
    }

    #[test]
    fn test_nested_data() {
        let body = r#"{"data": {"answer": "nested"}}"#;
        assert_eq!(text_of(parse_response(body, None)), "nested");
    }

    #[test]
    fn test_openai_choices() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": " hi "}}],
                       "usage": {"prompt_tokens": 10, "completion_tokens": 5}}"#;
        assert_eq!(
            parse_response(body, Some(99)),
            ParseOutcome::Parsed {
                text: "hi".to_string(),
                usage: Some(15)
            }
        );
    }

    #[test]
    fn test_usage_total_preferred() {
        let body = r#"{"reply": "x", "usage": {"total_tokens": 42, "prompt_tokens": 1}}"#;
        assert_eq!(
            parse_response(body, None),
            ParseOutcome::Parsed {
                text: "x".to_string(),
                usage: Some(42)
            }
        );
    }

    #[test]
    fn test_usage_counters_saturate() {
        let body = r#"{"text": "hi", "usage": {"prompt_tokens": 18446744073709551615, "completion_tokens": 1}}"#;
        assert_eq!(
            parse_response(body, None),
            ParseOutcome::Parsed {
                text: "hi".to_string(),
                usage: Some(u64::MAX)
            }
        );
    }

    #[test]
    fn test_header_tokens_used_when_body_silent() {
        assert_eq!(
            parse_response(r#"{"reply": "x"}"#, Some(7)),
            ParseOutcome::Parsed {
                text: "x".to_string(),
                usage: Some(7)
            }
        );
    }

    #[test]
    fn test_blank_text_is_parsed_empty() {
        assert_eq!(text_of(parse_response(r#"{"reply": "   "}"#, None)), "");
    }

    #[test]
    fn test_unknown_layouts_unparsed() {
        assert_eq!(parse_response(r#"{"status": "ok"}"#, None), ParseOutcome::Unparsed);
        assert_eq!(parse_response("", None), ParseOutcome::Unparsed);
        assert_eq!(parse_response("[1, 2]", None), ParseOutcome::Unparsed);
        assert!(!parse_response("{}", None).is_parsed());
    }
}
