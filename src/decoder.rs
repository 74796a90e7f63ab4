use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::DecoderConfig;
use crate::error::ArgumentError;
use crate::json::{JsonDecoder, SerdeJson};
use crate::types::{ChatMessage, FunctionCall, Generation, ParsedFunctionCall};
use crate::{DecodeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// The response is final; missing or malformed data is an error.
    #[default]
    Complete,
    /// The response may still be streaming in; missing or malformed data
    /// decodes to `None`.
    Partial,
}

/// What a successful decode produces, depending on `args_only`.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Arguments(Value),
    FunctionCall(ParsedFunctionCall),
}

impl Decoded {
    pub fn arguments(&self) -> &Value {
        match self {
            Self::Arguments(arguments) => arguments,
            Self::FunctionCall(call) => &call.arguments,
        }
    }

    pub fn function_name(&self) -> Option<&str> {
        match self {
            Self::Arguments(_) => None,
            Self::FunctionCall(call) => Some(&call.name),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Arguments(arguments) => arguments,
            Self::FunctionCall(call) => call.into_value(),
        }
    }

    /// Deserializes the parsed arguments into a caller type.
    pub fn arguments_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(self.arguments())
    }
}

/// Decodes the function call carried by a single chat generation.
#[derive(Debug, Clone)]
pub struct FunctionCallDecoder<J = SerdeJson> {
    config: DecoderConfig,
    json: J,
}

impl FunctionCallDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            json: SerdeJson,
        }
    }
}

impl Default for FunctionCallDecoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

impl<J: JsonDecoder> FunctionCallDecoder<J> {
    pub fn with_json_decoder(config: DecoderConfig, json: J) -> Self {
        Self { config, json }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn parse_result(&self, results: &[Generation]) -> Result<Option<Decoded>> {
        self.decode(results, ParseMode::Complete)
    }

    pub fn parse_partial(&self, results: &[Generation]) -> Result<Option<Decoded>> {
        self.decode(results, ParseMode::Partial)
    }

    /// Decodes `results`, which must hold exactly one chat generation.
    ///
    /// Shape violations fail in both modes. A missing `function_call`, a
    /// missing `arguments` key, or unparseable arguments fail in
    /// [`ParseMode::Complete`] and yield `None` in [`ParseMode::Partial`].
    pub fn decode(&self, results: &[Generation], mode: ParseMode) -> Result<Option<Decoded>> {
        let message = single_chat_message(results)?;
        self.decode_message(message, mode)
    }

    pub(crate) fn decode_message(
        &self,
        message: &ChatMessage,
        mode: ParseMode,
    ) -> Result<Option<Decoded>> {
        let Some(call) = message.function_call() else {
            return self.incomplete(mode, missing_function_call());
        };
        let Some(raw) = call.raw_arguments() else {
            return self.incomplete(mode, missing_arguments());
        };

        match mode {
            ParseMode::Complete => self.decode_complete(call, raw).map(Some),
            ParseMode::Partial => Ok(self.decode_partial(call, raw)),
        }
    }

    fn incomplete(&self, mode: ParseMode, err: DecodeError) -> Result<Option<Decoded>> {
        match mode {
            ParseMode::Complete => Err(err),
            ParseMode::Partial => {
                tracing::debug!(
                    mode = ?mode,
                    args_only = self.config.args_only,
                    reason = %err,
                    "treating response as incomplete"
                );
                Ok(None)
            }
        }
    }

    fn decode_complete(
        &self,
        call: &FunctionCall,
        raw: std::result::Result<&str, ArgumentError>,
    ) -> Result<Decoded> {
        let parsed = raw
            .and_then(|raw| {
                self.json
                    .parse_complete(raw, self.config.strict)
                    .map_err(ArgumentError::from)
            })
            .map_err(|err| {
                tracing::warn!(
                    function = %call.name,
                    strict = self.config.strict,
                    error = %err,
                    "failed to parse function call arguments"
                );
                DecodeError::from(err)
            })?;
        Ok(self.wrap(call, parsed))
    }

    fn decode_partial(
        &self,
        call: &FunctionCall,
        raw: std::result::Result<&str, ArgumentError>,
    ) -> Option<Decoded> {
        let raw = match raw {
            Ok(raw) => raw,
            Err(err) => {
                tracing::debug!(
                    mode = ?ParseMode::Partial,
                    args_only = self.config.args_only,
                    function = %call.name,
                    error = %err,
                    "skipping partial decode"
                );
                return None;
            }
        };

        let Some(parsed) = self.json.parse_partial(raw, self.config.strict) else {
            tracing::debug!(
                mode = ?ParseMode::Partial,
                args_only = self.config.args_only,
                function = %call.name,
                bytes = raw.len(),
                "arguments are not a JSON prefix yet"
            );
            return None;
        };
        Some(self.wrap(call, parsed))
    }

    fn wrap(&self, call: &FunctionCall, arguments: Value) -> Decoded {
        if self.config.args_only {
            Decoded::Arguments(arguments)
        } else {
            Decoded::FunctionCall(call.with_parsed_arguments(arguments))
        }
    }
}

fn single_chat_message(results: &[Generation]) -> Result<&ChatMessage> {
    let [generation] = results else {
        return Err(DecodeError::InvalidInput(format!(
            "expected exactly one result, got {}",
            results.len()
        )));
    };

    generation.message().ok_or_else(|| {
        DecodeError::InvalidInput(format!(
            "only chat generations are supported, got a {} generation",
            generation.kind()
        ))
    })
}

pub(crate) fn missing_function_call() -> DecodeError {
    DecodeError::MalformedResponse(
        "could not parse function call: missing `function_call` field".to_string(),
    )
}

fn missing_arguments() -> DecodeError {
    DecodeError::MalformedResponse(
        "could not parse function call: missing `arguments` field".to_string(),
    )
}
