use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

mod function_call;

pub use function_call::{FunctionCall, ParsedFunctionCall};

/// Reads an explicit `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    #[default]
    Assistant,
    Tool,
}

/// A conversational message. `function_call` is the only auxiliary field the
/// decoder reads; everything else a provider attaches lands in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_function_call(mut self, function_call: FunctionCall) -> Self {
        self.function_call = Some(function_call);
        self
    }

    pub fn function_call(&self) -> Option<&FunctionCall> {
        self.function_call.as_ref()
    }
}

/// One candidate output of a model invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Generation {
    Text { text: String },
    Chat { message: ChatMessage },
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn chat(message: ChatMessage) -> Self {
        Self::Chat { message }
    }

    /// The carried message, only for chat generations.
    pub fn message(&self) -> Option<&ChatMessage> {
        match self {
            Self::Chat { message } => Some(message),
            Self::Text { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Chat { .. } => "chat",
        }
    }
}
