use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decoder::{Decoded, FunctionCallDecoder, ParseMode, missing_function_call};
use crate::json::{JsonDecoder, SerdeJson};
use crate::types::{ChatMessage, FunctionCall, Generation};
use crate::{DecodeError, Result};

const DEFAULT_MAX_ARGUMENT_BYTES: usize = 4 * 1024 * 1024;

/// A streamed fragment of a function call. Fragments concatenate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCallChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// A streamed fragment of an assistant message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageChunk {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCallChunk>,
}

impl ChatMessageChunk {
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: text.into(),
            function_call: None,
        }
    }

    pub fn function_name(name: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            function_call: Some(FunctionCallChunk {
                name: Some(name.into()),
                arguments: None,
            }),
        }
    }

    pub fn arguments(fragment: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            function_call: Some(FunctionCallChunk {
                name: None,
                arguments: Some(fragment.into()),
            }),
        }
    }
}

/// Merges message chunks and re-decodes the whole message in partial mode
/// after each one, reporting a value only when it differs from the last one
/// reported.
#[derive(Debug)]
pub struct FunctionCallAccumulator<J = SerdeJson> {
    decoder: FunctionCallDecoder<J>,
    message: ChatMessage,
    last_emitted: Option<Decoded>,
    max_argument_bytes: usize,
}

impl<J: JsonDecoder> FunctionCallAccumulator<J> {
    pub fn new(decoder: FunctionCallDecoder<J>) -> Self {
        Self {
            decoder,
            message: ChatMessage::assistant(""),
            last_emitted: None,
            max_argument_bytes: DEFAULT_MAX_ARGUMENT_BYTES,
        }
    }

    pub fn with_max_argument_bytes(mut self, max_argument_bytes: usize) -> Self {
        self.max_argument_bytes = max_argument_bytes;
        self
    }

    pub fn push(&mut self, chunk: &ChatMessageChunk) -> Result<Option<Decoded>> {
        self.merge(chunk)?;

        let Some(decoded) = self
            .decoder
            .decode_message(&self.message, ParseMode::Partial)?
        else {
            return Ok(None);
        };
        if self.last_emitted.as_ref() == Some(&decoded) {
            return Ok(None);
        }

        tracing::trace!(
            argument_bytes = self.argument_bytes(),
            "function call value changed"
        );
        self.last_emitted = Some(decoded.clone());
        Ok(Some(decoded))
    }

    /// The message accumulated so far, as a chat generation.
    pub fn snapshot(&self) -> Generation {
        Generation::chat(self.message.clone())
    }

    /// Decodes the accumulated message as a final response.
    pub fn finish(self) -> Result<Decoded> {
        self.decoder
            .decode_message(&self.message, ParseMode::Complete)?
            .ok_or_else(missing_function_call)
    }

    fn argument_bytes(&self) -> usize {
        match self
            .message
            .function_call()
            .and_then(|call| call.arguments.as_ref())
        {
            Some(Value::String(raw)) => raw.len(),
            _ => 0,
        }
    }

    fn merge(&mut self, chunk: &ChatMessageChunk) -> Result<()> {
        let delta = chunk.function_call.as_ref();
        if let Some(fragment) = delta.and_then(|delta| delta.arguments.as_ref()) {
            if self.argument_bytes().saturating_add(fragment.len()) > self.max_argument_bytes {
                return Err(DecodeError::InvalidInput(format!(
                    "function call arguments exceed max_argument_bytes={}",
                    self.max_argument_bytes
                )));
            }
        }

        self.message.content.push_str(&chunk.content);
        let Some(delta) = delta else {
            return Ok(());
        };

        let call = self
            .message
            .function_call
            .get_or_insert_with(|| FunctionCall::without_arguments(""));
        if let Some(name) = &delta.name {
            call.name.push_str(name);
        }
        if let Some(fragment) = &delta.arguments {
            match &mut call.arguments {
                Some(Value::String(raw)) => raw.push_str(fragment),
                other => *other = Some(Value::String(fragment.clone())),
            }
        }
        Ok(())
    }
}

#[cfg(feature = "streaming")]
pub use streaming::decode_stream;

#[cfg(feature = "streaming")]
mod streaming {
    use futures_util::stream::{self, BoxStream};
    use futures_util::{Stream, StreamExt};

    use super::{ChatMessageChunk, FunctionCallAccumulator};
    use crate::decoder::{Decoded, FunctionCallDecoder};
    use crate::json::JsonDecoder;
    use crate::{DecodeError, Result};

    /// Adapts a stream of message chunks into a stream of partial decodes.
    ///
    /// Only changed values are yielded. An upstream error, or a chunk that
    /// overflows the argument buffer, is yielded once and ends the stream.
    pub fn decode_stream<S, E, J>(
        decoder: FunctionCallDecoder<J>,
        chunks: S,
    ) -> BoxStream<'static, Result<Decoded>>
    where
        S: Stream<Item = std::result::Result<ChatMessageChunk, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
        J: JsonDecoder + 'static,
    {
        let accumulator = FunctionCallAccumulator::new(decoder);
        stream::unfold(
            (chunks.boxed(), accumulator, false),
            |(mut chunks, mut accumulator, done)| async move {
                if done {
                    return None;
                }
                loop {
                    let next = match chunks.next().await? {
                        Ok(chunk) => accumulator.push(&chunk),
                        Err(err) => Err(DecodeError::Upstream(err.to_string())),
                    };
                    match next {
                        Ok(Some(decoded)) => {
                            return Some((Ok(decoded), (chunks, accumulator, false)));
                        }
                        Ok(None) => continue,
                        Err(err) => return Some((Err(err), (chunks, accumulator, true))),
                    }
                }
            },
        )
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecoderConfig;
    use serde_json::json;

    fn accumulator(args_only: bool) -> FunctionCallAccumulator {
        FunctionCallAccumulator::new(FunctionCallDecoder::new(
            DecoderConfig::default().with_args_only(args_only),
        ))
    }

    #[test]
    fn emits_only_when_value_changes() -> Result<()> {
        let mut acc = accumulator(true);

        assert_eq!(acc.push(&ChatMessageChunk::content(""))?, None);
        assert_eq!(acc.push(&ChatMessageChunk::function_name("get_weather"))?, None);
        assert_eq!(
            acc.push(&ChatMessageChunk::arguments("{\"city\": \"Os"))?,
            Some(Decoded::Arguments(json!({"city": "Os"})))
        );
        assert_eq!(
            acc.push(&ChatMessageChunk::arguments("lo\""))?,
            Some(Decoded::Arguments(json!({"city": "Oslo"})))
        );
        assert_eq!(acc.push(&ChatMessageChunk::arguments(", "))?, None);
        assert_eq!(
            acc.push(&ChatMessageChunk::arguments("\"days\": 3}"))?,
            Some(Decoded::Arguments(json!({"city": "Oslo", "days": 3})))
        );

        assert_eq!(
            acc.finish()?,
            Decoded::Arguments(json!({"city": "Oslo", "days": 3}))
        );
        Ok(())
    }

    #[test]
    fn full_mode_reports_name_as_it_streams() -> Result<()> {
        let mut acc = accumulator(false);

        acc.push(&ChatMessageChunk::function_name("get_"))?;
        acc.push(&ChatMessageChunk::function_name("weather"))?;
        let decoded = acc
            .push(&ChatMessageChunk::arguments("{}"))?
            .expect("first value");

        assert_eq!(
            decoded.into_value(),
            json!({"name": "get_weather", "arguments": {}})
        );
        Ok(())
    }

    #[test]
    fn snapshot_holds_concatenated_chunks() {
        let mut acc = accumulator(true);
        let _ = acc.push(&ChatMessageChunk::content("thinking "));
        let _ = acc.push(&ChatMessageChunk::function_name("f"));
        let _ = acc.push(&ChatMessageChunk::arguments("{\"a\""));

        let snapshot = acc.snapshot();
        let message = snapshot.message().expect("chat");
        assert_eq!(message.content, "thinking ");
        assert_eq!(
            message.function_call(),
            Some(&FunctionCall::new("f", "{\"a\""))
        );
    }

    #[test]
    fn finish_is_strict_about_truncation() {
        let mut acc = accumulator(true);
        let _ = acc.push(&ChatMessageChunk::function_name("f"));
        let _ = acc.push(&ChatMessageChunk::arguments("{\"x\": 1, \"y\": "));

        let err = acc.finish().expect_err("truncated arguments");
        assert!(matches!(err, DecodeError::ArgumentParse(_)));
    }

    #[test]
    fn finish_without_function_call_is_malformed() {
        let mut acc = accumulator(true);
        let _ = acc.push(&ChatMessageChunk::content("just text"));

        let err = acc.finish().expect_err("no function call");
        assert!(matches!(err, DecodeError::MalformedResponse(_)));
    }

    #[test]
    fn argument_buffer_is_bounded() {
        let mut acc = accumulator(true).with_max_argument_bytes(8);
        assert!(acc.push(&ChatMessageChunk::arguments("{\"a\":")).is_ok());

        let err = acc
            .push(&ChatMessageChunk::arguments("\"long\"}"))
            .expect_err("over limit");
        assert!(matches!(err, DecodeError::InvalidInput(_)));
    }

    #[test]
    fn rejected_chunk_leaves_message_unchanged() -> Result<()> {
        let mut acc = accumulator(true).with_max_argument_bytes(8);
        acc.push(&ChatMessageChunk::content("before "))?;
        acc.push(&ChatMessageChunk::arguments("{\"a\":"))?;
        let before = acc.snapshot();

        let oversized = ChatMessageChunk {
            content: "after".to_string(),
            function_call: Some(FunctionCallChunk {
                name: Some("f".to_string()),
                arguments: Some("\"long\"}".to_string()),
            }),
        };
        let err = acc.push(&oversized).expect_err("over limit");

        assert!(matches!(err, DecodeError::InvalidInput(_)));
        assert_eq!(acc.snapshot(), before);
        Ok(())
    }
}
