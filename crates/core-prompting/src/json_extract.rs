//! Three-tier JSON extraction from free-form model text: a well-behaved
//! model returns a bare JSON object, a markdown-fenced one, or (worst case)
//! JSON embedded in surrounding prose. Each tier is tried in order and the
//! first one that parses wins.

use crate::error::PromptingError;

/// Extracts the first top-level JSON object from `raw`, trying (1) the
/// whole string, (2) the contents of a ```json fenced block, (3) a
/// brace-depth scan for the first balanced `{...}` span.
pub fn extract_json(raw: &str) -> Result<serde_json::Value, PromptingError> {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    if let Some(fenced) = extract_from_markdown_block(trimmed) {
        if let Ok(value) = serde_json::from_str(&fenced) {
            return Ok(value);
        }
    }

    if let Some(object) = extract_first_object(trimmed) {
        if let Ok(value) = serde_json::from_str(&object) {
            return Ok(value);
        }
    }

    Err(PromptingError::ParseError {
        raw_text: raw.to_string(),
    })
}

/// Pulls the body out of the first ```json or bare ``` fenced block.
fn extract_from_markdown_block(text: &str) -> Option<String> {
    let start_marker = text.find("```json").map(|i| i + "```json".len());
    let start = start_marker.or_else(|| text.find("```").map(|i| i + "```".len()))?;
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim().to_string())
}

/// Scans for the first balanced `{...}` span, respecting string literals and
/// escape sequences so braces inside quoted text don't throw off the depth
/// count.
fn extract_first_object(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        let ch = byte as char;

        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return Some(text[start..end].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bare_object() {
        let raw = r#"{"action": "buy", "confidence": 72}"#;
        let value = extract_json(raw).unwrap();
        assert_eq!(value["action"], "buy");
    }

    #[test]
    fn extracts_from_fenced_block() {
        let raw = "Here's my analysis:\n```json\n{\"action\": \"sell\"}\n```\nLet me know.";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["action"], "sell");
    }

    #[test]
    fn extracts_first_object_amid_prose() {
        let raw = "Sure, my answer is {\"action\": \"hold\", \"note\": \"braces {like this} inside a string\"} and that's final.";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["action"], "hold");
    }

    #[test]
    fn braces_inside_string_values_do_not_break_depth_counting() {
        let raw = r#"{"reasoning": "if x > 0 { do_thing() }", "action": "buy"}"#;
        let value = extract_json(raw).unwrap();
        assert_eq!(value["action"], "buy");
    }

    #[test]
    fn no_json_object_is_a_parse_error() {
        let err = extract_json("I cannot comply with this request.").unwrap_err();
        assert!(matches!(err, PromptingError::ParseError { .. }));
    }
}
