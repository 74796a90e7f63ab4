use std::borrow::Cow;

use serde_json::Value;

mod partial;

pub use partial::parse_partial_json;

/// The two JSON capabilities the decoder chooses between.
///
/// `strict` follows the usual dialect switch: when `false`, raw control
/// characters inside string literals are accepted.
pub trait JsonDecoder: Send + Sync {
    fn parse_complete(&self, text: &str, strict: bool) -> serde_json::Result<Value>;

    /// Best-effort parse of a possibly truncated document. `None` when not even
    /// a structural prefix can be recovered.
    fn parse_partial(&self, text: &str, strict: bool) -> Option<Value>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerdeJson;

impl JsonDecoder for SerdeJson {
    fn parse_complete(&self, text: &str, strict: bool) -> serde_json::Result<Value> {
        parse_json(text, strict)
    }

    fn parse_partial(&self, text: &str, strict: bool) -> Option<Value> {
        parse_partial_json(text, strict)
    }
}

pub fn parse_json(text: &str, strict: bool) -> serde_json::Result<Value> {
    if strict {
        serde_json::from_str::<Value>(text)
    } else {
        serde_json::from_str::<Value>(&escape_control_chars_in_strings(text))
    }
}

/// Rewrites raw U+0000..U+001F inside string literals as escape sequences.
/// Text outside strings is left alone.
fn escape_control_chars_in_strings(text: &str) -> Cow<'_, str> {
    if !text.chars().any(char::is_control) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 8);
    let mut in_string = false;
    let mut escape = false;

    for c in text.chars() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }

        if escape {
            escape = false;
            out.push(c);
            continue;
        }

        match c {
            '\\' => {
                escape = true;
                out.push(c);
            }
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if c < '\u{20}' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }

    Cow::Owned(out)
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
