//! Request-body ceiling, enforced while the body streams in.
//!
//! Sits in front of everything else: an oversized request never reaches
//! routing, and the 413 it gets is built here rather than by the problem
//! pipeline.

use std::fmt::Display;
use std::pin::pin;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use http::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, Full};
use serde_json::json;
use tracing::{debug, warn};

use super::request_id::{RequestId, X_REQUEST_ID};
use crate::error::Error;
use crate::{cbor, media};

/// Outcome of guarding one request.
#[derive(Debug)]
pub enum Guarded {
    /// The whole body, replayable exactly once like the original transport.
    Accepted(http::Request<Full<Bytes>>),
    /// Ready-to-send 413.
    TooLarge(http::Response<Full<Bytes>>),
}

#[derive(Clone, Copy, Debug)]
pub struct BodyLimit {
    max: usize,
}

impl BodyLimit {
    pub fn new(max: usize) -> Self {
        Self { max }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Buffers the body of `req` unless it exceeds the ceiling.
    ///
    /// A declared `Content-Length` over the limit is refused without reading.
    /// Otherwise chunks are counted as they arrive and reading stops at the
    /// first chunk that would cross the limit. The unread remainder is left
    /// to the connection, which discards it or closes once the 413 is sent.
    ///
    /// Returns [`Error::Disconnected`] when the transport fails mid-body;
    /// no response should be written then.
    pub async fn guard<B>(&self, req: http::Request<B>) -> Result<Guarded, Error>
    where
        B: Body,
        B::Error: Display,
    {
        let (parts, body) = req.into_parts();
        let mut body = pin!(body);

        let declared = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let max = u64::try_from(self.max).unwrap_or(u64::MAX);
        if declared.is_some_and(|len| len > max) {
            debug!(declared, max = self.max, "declared body length over limit");
            return Ok(Guarded::TooLarge(too_large(&parts.headers)));
        }

        let mut buf = BytesMut::new();
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|e| Error::Disconnected(e.to_string()))?;
            let Ok(mut data) = frame.into_data() else {
                continue;
            };
            if buf.len() + data.remaining() > self.max {
                warn!(received = buf.len() + data.remaining(), max = self.max, "request body over limit");
                return Ok(Guarded::TooLarge(too_large(&parts.headers)));
            }
            while data.has_remaining() {
                let chunk = data.chunk();
                let n = chunk.len();
                buf.put_slice(chunk);
                data.advance(n);
            }
        }

        Ok(Guarded::Accepted(http::Request::from_parts(parts, Full::new(buf.freeze()))))
    }
}

/// The 413 document, negotiated the same way problem documents are.
fn too_large(request_headers: &http::HeaderMap) -> http::Response<Full<Bytes>> {
    let accept = request_headers.get(ACCEPT).and_then(|v| v.to_str().ok()).unwrap_or_default();
    let document = json!({
        "title": "Payload Too Large",
        "status": 413,
        "detail": "Request body too large",
    });

    let (content_type, body) = match media::wants_problem_cbor(accept).then(|| cbor::encode_json(&document)) {
        Some(Ok(bytes)) => (media::PROBLEM_CBOR, Bytes::from(bytes)),
        _ => (media::PROBLEM_JSON, Bytes::from(document.to_string())),
    };

    let request_id = RequestId::from_headers(request_headers);
    let mut response = http::Response::new(Full::new(body.clone()));
    *response.status_mut() = StatusCode::PAYLOAD_TOO_LARGE;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    headers.insert(X_REQUEST_ID, request_id.header_value());
    response
}
