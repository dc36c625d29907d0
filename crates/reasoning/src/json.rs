//! JSON extraction from reasoning-call replies.
//!
//! Models occasionally wrap JSON in markdown fences despite instructions;
//! strip them before parsing.

use wealthdesk_core::error::ReasoningError;

/// Parse a reply as JSON, tolerating ``` fences around the body.
pub fn parse_json_reply(raw: &str) -> Result<serde_json::Value, ReasoningError> {
    let text = raw.trim();
    let text = if text.starts_with("```") {
        let inner = match text.find('\n') {
            Some(first_newline) => {
                let last_fence = text.rfind("```").unwrap_or(text.len());
                if last_fence > first_newline {
                    &text[first_newline + 1..last_fence]
                } else {
                    &text[first_newline + 1..]
                }
            }
            None => text,
        };
        inner.trim()
    } else {
        text
    };

    serde_json::from_str(text).map_err(|e| ReasoningError::Malformed(format!("JSON parse: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json() {
        let value = parse_json_reply(r#"{"agents": ["quant"]}"#).unwrap();
        assert_eq!(value["agents"][0], "quant");
    }

    #[test]
    fn strips_plain_fences() {
        let value = parse_json_reply("```\n{\"a\": 1}\n```").unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn strips_language_tagged_fences() {
        let value = parse_json_reply("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            parse_json_reply("definitely not json"),
            Err(ReasoningError::Malformed(_))
        ));
    }
}
