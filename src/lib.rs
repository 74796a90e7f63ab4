mod config;
mod decoder;
mod error;

pub mod json;
pub mod stream;
pub mod types;

pub use config::DecoderConfig;
pub use decoder::{Decoded, FunctionCallDecoder, ParseMode};
pub use error::{ArgumentError, DecodeError, Result};
pub use json::{JsonDecoder, SerdeJson};
#[cfg(feature = "streaming")]
pub use stream::decode_stream;
pub use stream::{ChatMessageChunk, FunctionCallAccumulator, FunctionCallChunk};
pub use types::{ChatMessage, FunctionCall, Generation, ParsedFunctionCall, Role};
