//! Opaque pagination cursors.
//!
//! Wire form: unpadded base64url of `"{kind}:{value}"`. Clients treat it as
//! an opaque token.

use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("invalid cursor format")]
    Malformed,

    #[error("invalid cursor type: expected '{expected}'")]
    WrongType { expected: String },
}

/// A decoded cursor: which collection it belongs to and the id of the last
/// item the client saw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
    pub kind: String,
    pub value: String,
}

impl Cursor {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self { kind: kind.into(), value: value.into() }
    }

    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(format!("{}:{}", self.kind, self.value))
    }

    /// Decodes a wire cursor. The value may itself contain colons; only the
    /// first one separates kind from value.
    pub fn decode(raw: &str) -> Result<Self, CursorError> {
        let mut padded = raw.to_owned();
        while padded.len() % 4 != 0 {
            padded.push('=');
        }
        let bytes = URL_SAFE.decode(padded.as_bytes()).map_err(|_| CursorError::Malformed)?;
        let text = String::from_utf8(bytes).map_err(|_| CursorError::Malformed)?;
        let (kind, value) = text.split_once(':').ok_or(CursorError::Malformed)?;
        Ok(Self::new(kind, value))
    }

    /// Decodes and checks the kind tag in one step.
    pub fn decode_expecting(raw: &str, kind: &str) -> Result<Self, CursorError> {
        let cursor = Self::decode(raw)?;
        if cursor.kind != kind {
            return Err(CursorError::WrongType { expected: kind.to_owned() });
        }
        Ok(cursor)
    }
}
