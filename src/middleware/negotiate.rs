//! Response transcoding: JSON out, CBOR when the client names it.

use bytes::Bytes;
use http::header::ACCEPT;
use tracing::debug;

use crate::cbor;
use crate::error::ApiError;
use crate::handler::BoxedHandler;
use crate::media;
use crate::request::Request;
use crate::response::{Outcome, Response};

/// Wraps a handler call with request-body transcoding on the way in and
/// response negotiation on the way out.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseTranscoder;

impl ResponseTranscoder {
    pub async fn call(&self, handler: &BoxedHandler, mut req: Request) -> Outcome {
        // Read before the body is touched: transcoding rewrites headers.
        let accept = req.header(ACCEPT.as_str()).unwrap_or_default().to_owned();

        // Settle the body so 415 / 400 surface before business logic runs.
        req.body()?;

        let response = handler.call(req).await?;
        negotiate(&accept, response).map_err(Into::into)
    }
}

/// Re-encodes a JSON response as CBOR when `accept` explicitly asks for
/// `application/cbor`. Anything else, including empty bodies, passes through.
pub fn negotiate(accept: &str, mut response: Response) -> Result<Response, ApiError> {
    let is_json = response.content_type().is_some_and(|ct| media::content_type_matches(ct, media::JSON));
    if !is_json || response.body().is_empty() || !media::accepts(accept, media::CBOR, true) {
        return Ok(response);
    }

    let encoded = match response.cbor.take() {
        Some(render) => render(),
        None => serde_json::from_slice(response.body())
            .map_err(|e| cbor::CborError::Encode(e.to_string()))
            .and_then(|value| cbor::encode_json(&value)),
    }
    .map_err(|e| ApiError::internal(format!("response CBOR encoding: {e}")))?;

    debug!(json_len = response.body().len(), cbor_len = encoded.len(), "response transcoded to CBOR");
    response.replace_body(media::CBOR, Bytes::from(encoded));
    Ok(response)
}
