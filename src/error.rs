use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("could not parse function call data: {0}")]
    ArgumentParse(#[from] ArgumentError),
    #[error("upstream stream error: {0}")]
    Upstream(String),
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a function call's `arguments` could not be turned into JSON.
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("expected arguments to be a JSON string, got {found}")]
    NotAString { found: &'static str },
}

pub type Result<T> = std::result::Result<T, DecodeError>;
