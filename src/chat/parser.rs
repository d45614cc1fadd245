// src/chat/parser.rs
// JSON recovery ladder for raw LLM text (spec §4.J). Upstream models emit
// `{"answer": ..., "suggested_answer": ...}` inconsistently — sometimes
// fenced in markdown, sometimes wrapped in prose. Preserve the exact order
// of fallback strategies: behavioural tests depend on which one fires.

use regex::Regex;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTurn {
    pub answer: String,
    pub suggested_answer: Option<String>,
}

pub fn recover(raw: &str) -> ParsedTurn {
    let candidate = try_direct(raw)
        .or_else(|| try_stripped_fences(raw))
        .or_else(|| try_first_brace_region(raw))
        .or_else(|| try_regex_literals(raw));

    match candidate {
        Some(parsed) => finish(parsed),
        None => ParsedTurn { answer: raw.trim().to_string(), suggested_answer: None },
    }
}

fn try_direct(raw: &str) -> Option<ParsedTurn> {
    extract_from_value(&serde_json::from_str::<Value>(raw.trim()).ok()?)
}

fn try_stripped_fences(raw: &str) -> Option<ParsedTurn> {
    let fence = Regex::new(r"```(?:json)?\s*([\s\S]*?)```").ok()?;
    let inner = fence.captures(raw)?.get(1)?.as_str();
    extract_from_value(&serde_json::from_str::<Value>(inner.trim()).ok()?)
}

fn try_first_brace_region(raw: &str) -> Option<ParsedTurn> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    extract_from_value(&serde_json::from_str::<Value>(&raw[start..=end]).ok()?)
}

fn try_regex_literals(raw: &str) -> Option<ParsedTurn> {
    let answer_re = Regex::new(r#""answer"\s*:\s*"((?:[^"\\]|\\.)*)""#).ok()?;
    let suggested_re = Regex::new(r#""suggested_answer"\s*:\s*"((?:[^"\\]|\\.)*)""#).ok()?;

    let answer = answer_re.captures(raw)?.get(1)?.as_str();
    let suggested_answer = suggested_re.captures(raw).and_then(|c| c.get(1)).map(|m| m.as_str());

    Some(ParsedTurn {
        answer: unescape(answer),
        suggested_answer: suggested_answer.map(unescape),
    })
}

fn extract_from_value(value: &Value) -> Option<ParsedTurn> {
    let answer = value.get("answer")?.as_str()?.to_string();
    let suggested_answer = value
        .get("suggested_answer")
        .and_then(|v| if v.is_null() { None } else { v.as_str().map(str::to_string) });
    Some(ParsedTurn { answer, suggested_answer })
}

/// If the extracted `answer` is itself a JSON object, parse it once more —
/// some providers double-wrap the payload.
fn finish(parsed: ParsedTurn) -> ParsedTurn {
    match serde_json::from_str::<Value>(parsed.answer.trim()) {
        Ok(inner) if inner.is_object() => extract_from_value(&inner).unwrap_or(parsed),
        _ => parsed,
    }
}

fn unescape(s: &str) -> String {
    s.replace("\\\"", "\"").replace("\\n", "\n").replace("\\\\", "\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let parsed = recover(r#"{"answer": "hi", "suggested_answer": "hey"}"#);
        assert_eq!(parsed.answer, "hi");
        assert_eq!(parsed.suggested_answer.as_deref(), Some("hey"));
    }

    #[test]
    fn parses_fenced_json() {
        let parsed = recover("```json\n{\"answer\": \"hi\", \"suggested_answer\": null}\n```");
        assert_eq!(parsed.answer, "hi");
        assert_eq!(parsed.suggested_answer, None);
    }

    #[test]
    fn parses_json_embedded_in_prose() {
        let parsed = recover("Sure, here you go: {\"answer\": \"hi\", \"suggested_answer\": \"yo\"} thanks!");
        assert_eq!(parsed.answer, "hi");
        assert_eq!(parsed.suggested_answer.as_deref(), Some("yo"));
    }

    #[test]
    fn falls_back_to_regex_literals_on_malformed_json() {
        let parsed = recover(r#"{"answer": "hi" "suggested_answer": "yo"}"#);
        assert_eq!(parsed.answer, "hi");
        assert_eq!(parsed.suggested_answer.as_deref(), Some("yo"));
    }

    #[test]
    fn falls_back_to_raw_text_when_everything_fails() {
        let parsed = recover("just a plain sentence with no structure");
        assert_eq!(parsed.answer, "just a plain sentence with no structure");
        assert_eq!(parsed.suggested_answer, None);
    }

    #[test]
    fn double_wrapped_answer_is_parsed_again() {
        let parsed = recover(r#"{"answer": "{\"answer\": \"inner\", \"suggested_answer\": \"s\"}", "suggested_answer": null}"#);
        assert_eq!(parsed.answer, "inner");
        assert_eq!(parsed.suggested_answer.as_deref(), Some("s"));
    }
}
