use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::null_as_default;
use crate::error::ArgumentError;
use crate::json::json_type_name;

/// The `{name, arguments}` envelope a model uses to request a function call.
///
/// `arguments` is kept as the raw JSON value the provider sent: normally a
/// string of JSON text, sometimes `null` when the model supplied no
/// arguments. `None` means the key itself was absent. Fields other than
/// `name` and `arguments` are carried in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub arguments: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// `Option<Value>` alone reads an explicit `null` as `None`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Some(Value::String(arguments.into())),
            extra: Map::new(),
        }
    }

    pub fn without_arguments(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Some(Value::Null),
            extra: Map::new(),
        }
    }

    /// The argument text to hand to a JSON parser, or `None` when the record
    /// has no `arguments` key. `null` reads as `""`.
    pub fn raw_arguments(&self) -> Option<Result<&str, ArgumentError>> {
        let raw = match self.arguments.as_ref()? {
            Value::Null => Ok(""),
            Value::String(raw) => Ok(raw.as_str()),
            other => Err(ArgumentError::NotAString {
                found: json_type_name(other),
            }),
        };
        Some(raw)
    }

    pub(crate) fn with_parsed_arguments(&self, arguments: Value) -> ParsedFunctionCall {
        ParsedFunctionCall {
            name: self.name.clone(),
            arguments,
            extra: self.extra.clone(),
        }
    }
}

/// A [`FunctionCall`] whose `arguments` text has been parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFunctionCall {
    pub name: String,
    pub arguments: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ParsedFunctionCall {
    pub fn into_value(self) -> Value {
        let mut map = self.extra;
        map.insert("name".to_string(), Value::String(self.name));
        map.insert("arguments".to_string(), self.arguments);
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_arguments_read_as_empty() -> serde_json::Result<()> {
        let null: FunctionCall =
            serde_json::from_value(json!({"name": "noop", "arguments": null}))?;

        assert_eq!(null.arguments, Some(Value::Null));
        assert_eq!(null.raw_arguments().and_then(Result::ok), Some(""));
        assert_eq!(null, FunctionCall::without_arguments("noop"));
        Ok(())
    }

    #[test]
    fn missing_arguments_key_is_distinct_from_null() -> serde_json::Result<()> {
        let missing: FunctionCall = serde_json::from_value(json!({"name": "noop"}))?;

        assert_eq!(missing.arguments, None);
        assert!(missing.raw_arguments().is_none());
        assert_eq!(serde_json::to_value(&missing)?, json!({"name": "noop"}));
        Ok(())
    }

    #[test]
    fn null_or_missing_name_reads_as_empty() -> serde_json::Result<()> {
        let null: FunctionCall =
            serde_json::from_value(json!({"name": null, "arguments": "{}"}))?;
        let missing: FunctionCall = serde_json::from_value(json!({"arguments": "{}"}))?;

        assert_eq!(null.name, "");
        assert_eq!(null, missing);
        Ok(())
    }

    #[test]
    fn non_string_arguments_are_rejected() {
        let call = FunctionCall {
            arguments: Some(json!({"already": "parsed"})),
            ..FunctionCall::without_arguments("f")
        };
        let err = call
            .raw_arguments()
            .and_then(Result::err)
            .expect("object arguments");
        assert!(matches!(err, ArgumentError::NotAString { found: "object" }));
    }

    #[test]
    fn parsed_call_keeps_extra_fields_in_value() {
        let mut call = FunctionCall::new("f", "{}");
        call.extra.insert("id".to_string(), json!("call_0"));

        let value = call.with_parsed_arguments(json!({"a": 1})).into_value();
        assert_eq!(
            value,
            json!({"id": "call_0", "name": "f", "arguments": {"a": 1}})
        );
    }
}
