//! Locating JSON objects embedded in log lines
//!
//! Arena lines look like `[UnityCrossThreadLogger]2025-10-08 10:00:00 {...}`, and
//! some carry trailing text after the payload. Every extraction call site goes
//! through [`extract_balanced_object`].

use serde_json::{Map, Value};

/// Return the first balanced top-level `{...}` at or after `start`.
///
/// Braces inside string literals (including escaped quotes) do not count.
/// Returns `None` when there is no `{` or the object never closes.
pub fn extract_balanced_object(text: &str, start: usize) -> Option<&str> {
    let open = start + text.get(start..)?.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    // Structural characters are ASCII, so byte scanning never splits a UTF-8 sequence.
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Decode the JSON object carried by a log line.
///
/// A line that is exactly one object is parsed directly; otherwise the first
/// balanced object is cut out first. Anything that is not a JSON object yields `None`.
pub fn parse_line_object(line: &str) -> Option<Map<String, Value>> {
    let trimmed = line.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        if let Ok(Value::Object(map)) = serde_json::from_str(trimmed) {
            return Some(map);
        }
    }

    let slice = extract_balanced_object(line, 0)?;
    match serde_json::from_str(slice) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
