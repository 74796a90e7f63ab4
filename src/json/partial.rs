use serde_json::Value;

use super::parse_json;

/// Parses JSON that may have been cut off mid-stream.
///
/// Open strings are closed, pending `}`/`]` are appended, and trailing
/// characters are dropped one at a time until the candidate parses. So
/// `{"x": 1, "y": ` yields `{"x": 1}` and `{"msg": "hel` yields
/// `{"msg": "hel"}`. A closer that does not match the open container means the
/// text is not a JSON prefix at all and yields `None`.
pub fn parse_partial_json(text: &str, strict: bool) -> Option<Value> {
    if let Ok(value) = parse_json(text, strict) {
        return Some(value);
    }

    let mut repaired = String::with_capacity(text.len() + 8);
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for c in text.chars() {
        if in_string {
            match c {
                '"' if !escape => in_string = false,
                '\n' if !escape => {
                    repaired.push_str("\\n");
                    continue;
                }
                '\\' => escape = !escape,
                _ => escape = false,
            }
            repaired.push(c);
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                escape = false;
            }
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                if closers.last() != Some(&c) {
                    return None;
                }
                closers.pop();
            }
            _ => {}
        }
        repaired.push(c);
    }

    if in_string {
        if escape {
            repaired.pop();
        }
        repaired.push('"');
    }

    let suffix: String = closers.iter().rev().collect();
    while !repaired.is_empty() {
        let candidate = format!("{repaired}{suffix}");
        if let Ok(value) = parse_json(&candidate, strict) {
            return Some(value);
        }
        repaired.pop();
    }

    None
}
