use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

fn default_true() -> bool {
    true
}

/// Construction-time options for [`crate::FunctionCallDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecoderConfig {
    /// Return only the parsed arguments instead of the whole call record.
    #[serde(default = "default_true")]
    pub args_only: bool,
    /// Reject raw control characters inside JSON strings.
    #[serde(default)]
    pub strict: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            args_only: true,
            strict: false,
        }
    }
}

impl DecoderConfig {
    pub fn with_args_only(mut self, args_only: bool) -> Self {
        self.args_only = args_only;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str::<Self>(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }
}
