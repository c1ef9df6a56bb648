//! The in-flight request body and its one-shot CBOR → JSON transcoding.
//!
//! ```text
//! Unread ──read()──▶ Passthrough   (JSON, no Content-Type, or empty body)
//!                ├─▶ Decoded       (CBOR, rewritten to JSON)
//!                └─▶ Rejected      (415 / 400, remembered)
//! ```
//!
//! Every later `read()` returns the settled outcome; the bytes never change
//! again.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use thiserror::Error;
use tracing::debug;

use crate::{cbor, media};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TranscodeError {
    #[error("Content-Type '{content_type}' not supported")]
    UnsupportedMediaType { content_type: String },

    #[error("Failed to decode CBOR: {0}")]
    InvalidCbor(String),
}

#[derive(Debug)]
enum State {
    Unread(Bytes),
    Passthrough(Bytes),
    Decoded(Bytes),
    Rejected(TranscodeError),
}

/// Request body bytes owned by exactly one request.
#[derive(Debug)]
pub struct Envelope {
    state: State,
}

impl Envelope {
    pub fn new(body: Bytes) -> Self {
        Self { state: State::Unread(body) }
    }

    /// Returns the body, transcoding CBOR to JSON on first call.
    ///
    /// When a CBOR body is decoded, `headers` is rewritten so Content-Type
    /// says JSON and Content-Length matches the new bytes.
    pub fn read(&mut self, headers: &mut HeaderMap) -> Result<&Bytes, TranscodeError> {
        if let State::Unread(body) = &self.state {
            let body = body.clone();
            self.state = settle(body, headers);
        }
        match &self.state {
            State::Unread(body) | State::Passthrough(body) | State::Decoded(body) => Ok(body),
            State::Rejected(err) => Err(err.clone()),
        }
    }

    /// Whether a CBOR body was rewritten to JSON.
    pub fn was_transcoded(&self) -> bool {
        matches!(self.state, State::Decoded(_))
    }
}

fn settle(body: Bytes, headers: &mut HeaderMap) -> State {
    // Lossy so that a non-UTF-8 value is refused below rather than ignored.
    let content_type = headers
        .get(CONTENT_TYPE)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .unwrap_or_default();

    if body.is_empty() || content_type.is_empty() {
        return State::Passthrough(body);
    }

    if !media::is_allowed_content_type(&content_type) {
        return State::Rejected(TranscodeError::UnsupportedMediaType {
            content_type: media::normalize(&content_type),
        });
    }

    if !media::content_type_matches(&content_type, media::CBOR) {
        return State::Passthrough(body);
    }

    let json = match cbor::decode_to_json(&body).and_then(|value| {
        serde_json::to_vec(&value).map_err(|e| cbor::CborError::Encode(e.to_string()))
    }) {
        Ok(json) => Bytes::from(json),
        Err(e) => return State::Rejected(TranscodeError::InvalidCbor(e.to_string())),
    };

    debug!(cbor_len = body.len(), json_len = json.len(), "transcoded CBOR request body");
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(media::JSON));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(json.len()));
    State::Decoded(json)
}
