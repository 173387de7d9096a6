//! Recovery of JSON values embedded in model-generated text.
//!
//! Models wrap structured output in prose, fences, or wrapper objects; this
//! module tolerates all of them. Nothing here returns an error: the worst
//! outcome is an empty string or an empty product list, which the calling
//! stage reports as its own failure.

use regex::Regex;
use serde_json::Value;

/// Wrapper keys some models nest their real payload under.
const WRAPPER_KEYS: [&str; 4] = ["results", "result", "response", "data"];

/// Extract the JSON payload from model text.
///
/// Priority:
/// 1. A ```json fenced block (case-insensitive tag): trimmed interior.
/// 2. Any fenced block: trimmed interior.
/// 3. The largest balanced `{...}` or `[...]` span that parses as JSON.
/// 4. The trimmed text itself, when it starts with `{` or `[`.
/// Otherwise the empty string.
pub fn extract_json_block(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let fence = Regex::new(r"(?i)```json\s*([\s\S]*?)```").unwrap();
    if let Some(caps) = fence.captures(text) {
        return caps[1].trim().to_string();
    }

    let any_fence = Regex::new(r"```\s*([\s\S]*?)```").unwrap();
    if let Some(caps) = any_fence.captures(text) {
        return caps[1].trim().to_string();
    }

    if let Some(span) = largest_json_span(text) {
        return span.to_string();
    }

    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed.to_string();
    }

    String::new()
}

/// Scan for the largest balanced brace/bracket span that parses as JSON.
///
/// Span start positions go on a stack; each matching close yields a
/// candidate, kept when it is the longest that parses so far. String
/// literals and escapes are honored so braces inside JSON strings don't
/// derail the nesting count; a raw newline closes any open string state,
/// since valid JSON strings cannot contain one.
fn largest_json_span(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut stack: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut best: Option<(usize, usize)> = None;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' || b == b'\n' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => stack.push(i),
            b'}' | b']' => {
                let Some(start) = stack.pop() else { continue };
                let open = bytes[start];
                let matched =
                    (open == b'{' && b == b'}') || (open == b'[' && b == b']');
                if !matched {
                    // Mismatched nesting: whatever this was, it isn't JSON.
                    stack.clear();
                    continue;
                }
                let candidate = &text[start..=i];
                let longer = best.map_or(true, |(s, e)| candidate.len() > e - s);
                if longer && serde_json::from_str::<Value>(candidate).is_ok() {
                    best = Some((start, i + 1));
                }
            }
            _ => {}
        }
    }

    best.map(|(s, e)| &text[s..e])
}

/// Parse a product list from model text.
///
/// Recognized shapes, in order: a wrapper object whose payload is a
/// JSON-encoded string, a direct `{"products": [...]}` object, and a bare
/// array of objects. Non-object array elements are skipped. Anything else,
/// including text that isn't JSON at all, yields an empty list, never an
/// error.
pub fn parse_products(text: &str) -> Vec<Value> {
    let raw = extract_json_block(text);
    if raw.is_empty() {
        return Vec::new();
    }
    let data: Value = match serde_json::from_str(&raw) {
        Ok(d) => d,
        Err(_) => return Vec::new(),
    };
    products_from_value(&data, 0)
}

fn products_from_value(data: &Value, depth: u8) -> Vec<Value> {
    if depth > 2 {
        return Vec::new();
    }

    // Wrapper shape: the real payload nested (possibly string-encoded) under
    // an intermediate key, e.g. {"results": "{\"products\": [...]}"}.
    if let Some(obj) = data.as_object() {
        if !obj.contains_key("products") {
            for key in WRAPPER_KEYS {
                match obj.get(key) {
                    Some(Value::String(inner)) => {
                        let inner = extract_json_block(inner);
                        if let Ok(inner_val) = serde_json::from_str::<Value>(&inner) {
                            return products_from_value(&inner_val, depth + 1);
                        }
                    }
                    Some(inner @ Value::Object(_)) => {
                        return products_from_value(inner, depth + 1);
                    }
                    _ => {}
                }
            }
        }
    }

    // Direct shape: {"products": [...]}.
    if let Some(arr) = data.get("products").and_then(Value::as_array) {
        return arr.iter().filter(|v| v.is_object()).cloned().collect();
    }

    // Bare array of objects.
    if let Some(arr) = data.as_array() {
        return arr.iter().filter(|v| v.is_object()).cloned().collect();
    }

    Vec::new()
}
