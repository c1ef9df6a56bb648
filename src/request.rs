//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::middleware::request_id::RequestId;
use crate::validation::{Location, Violation};

/// An incoming HTTP request with its body already buffered.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) extensions: Extensions,
    pub(crate) params: HashMap<String, String>,
    pub(crate) envelope: Envelope,
    pub(crate) base_url: String,
}

impl Request {
    pub(crate) fn new(
        parts: http::request::Parts,
        body: Bytes,
        params: HashMap<String, String>,
        base_url: String,
    ) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            extensions: parts.extensions,
            params,
            envelope: Envelope::new(body),
            base_url,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Current headers. After a CBOR body has been read these describe the
    /// JSON it was transcoded to.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Header lookup; non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/items/{id}`, `req.param("id")` on `/items/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Percent-decoded query pairs. For repeated keys the last one wins.
    pub fn query(&self) -> HashMap<String, String> {
        query_pairs(self.uri.query().unwrap_or_default()).collect()
    }

    /// The request id assigned before routing.
    pub fn request_id(&self) -> Option<&str> {
        self.extensions.get::<RequestId>().map(RequestId::as_str)
    }

    /// Public origin of this API, e.g. `https://api.example.com`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The body as JSON-or-raw bytes. A CBOR body is transcoded to JSON on
    /// the first call; every later call returns the same bytes.
    pub fn body(&mut self) -> Result<&Bytes, ApiError> {
        self.envelope.read(&mut self.headers).map_err(ApiError::from)
    }

    /// Deserializes the body as JSON, whichever format it arrived in.
    ///
    /// Malformed or mistyped JSON is reported as a validation failure at
    /// `body`.
    pub fn json<T: DeserializeOwned>(&mut self) -> Result<T, ApiError> {
        let body = self.body()?;
        serde_json::from_slice(body).map_err(|e| {
            ApiError::Validation(Violation::new(Location::body(), format!("Invalid JSON body: {e}")).into())
        })
    }
}

pub(crate) fn query_pairs(query: &str) -> impl Iterator<Item = (String, String)> + '_ {
    query.split('&').filter(|pair| !pair.is_empty()).map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (decode_component(key), decode_component(value))
    })
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Origin of the request as the client saw it: the configured public URL,
/// else `X-Forwarded-Proto` (or `http`) plus `Host`.
pub(crate) fn base_url(headers: &HeaderMap, uri: &Uri, configured: Option<&str>) -> String {
    if let Some(url) = configured {
        return url.trim_end_matches('/').to_owned();
    }
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_ascii_lowercase())
        .or_else(|| uri.scheme_str().map(str::to_owned))
        .unwrap_or_else(|| "http".to_owned());
    let host = headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or("localhost");
    format!("{scheme}://{host}")
}
