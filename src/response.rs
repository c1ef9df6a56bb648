//! Outgoing HTTP response type and the conversions handlers return through.
//!
//! Build a [`Response`] in your handler, or return [`Json`] and let the
//! negotiation layer decide between JSON and CBOR on the way out.

use std::fmt;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;

use crate::cbor::{self, CborError};
use crate::error::BoxError;
use crate::media;

/// Renders the original typed payload as CBOR, so values that serialize
/// differently in binary formats (timestamps) come out tagged.
pub(crate) type CborRenderer = Box<dyn FnOnce() -> Result<Vec<u8>, CborError> + Send>;

/// An outgoing HTTP response.
///
/// # Shortcuts
///
/// ```rust
/// use conneg::Response;
/// use http::StatusCode;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// ```
///
/// # Builder
///
/// ```rust
/// use conneg::Response;
/// use http::StatusCode;
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/items/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) cbor: Option<CborRenderer>,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(status: StatusCode) -> Self {
        Self::builder().status(status).no_body()
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { status: StatusCode::OK, headers: HeaderMap::new() }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Swaps the body, dropping any typed CBOR renderer with the old one.
    pub(crate) fn replace_body(&mut self, content_type: &'static str, body: Bytes) {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.headers.remove(CONTENT_LENGTH);
        self.body = body;
        self.cbor = None;
    }

    /// Converts into the hyper-facing response, fixing up Content-Length.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut headers = self.headers;
        headers.insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));

        let mut response = http::Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        response
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("typed_cbor", &self.cbor.is_some())
            .finish()
    }
}

/// Fluent builder for [`Response`]. Defaults to `200 OK`.
///
/// Invalid header names or values passed to [`header`](Self::header) are
/// dropped.
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HeaderMap,
}

impl ResponseBuilder {
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish(media::JSON, body.into(), None)
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish("text/plain; charset=utf-8", Bytes::from(body.into()), None)
    }

    /// Any other media type, e.g. [`media::SCHEMA_JSON`].
    pub fn bytes(self, content_type: &'static str, body: impl Into<Bytes>) -> Response {
        self.finish(content_type, body.into(), None)
    }

    /// Serializes `value` as the JSON body and keeps it for a typed CBOR
    /// rendering, should the client ask for CBOR.
    pub fn serialize<T>(self, value: T) -> Result<Response, serde_json::Error>
    where
        T: Serialize + Send + 'static,
    {
        let body = serde_json::to_vec(&value)?;
        let renderer: CborRenderer = Box::new(move || cbor::to_vec(&value));
        Ok(self.finish(media::JSON, Bytes::from(body), Some(renderer)))
    }

    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Bytes::new(), cbor: None }
    }

    fn finish(mut self, content_type: &'static str, body: Bytes, cbor: Option<CborRenderer>) -> Response {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Response { status: self.status, headers: self.headers, body, cbor }
    }
}

/// A serializable payload sent as JSON, or CBOR when negotiated.
///
/// ```rust
/// use conneg::Json;
/// use serde_json::json;
///
/// async fn health(_req: conneg::Request) -> Json<serde_json::Value> {
///     Json(json!({"status": "healthy"}))
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Json<T>(pub T);

// ── Conversions ───────────────────────────────────────────────────────────────

/// What a handler resolves to: a response, or an error for the problem
/// pipeline.
pub type Outcome = Result<Response, BoxError>;

/// Infallible conversion into a [`Response`].
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        Response::status(self)
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

/// Conversion of a handler's return value into an [`Outcome`].
///
/// Return `Result<T, E>` from a handler and any `E` that is a
/// `std::error::Error` reaches the problem pipeline:
///
/// ```rust
/// use conneg::{DomainError, Json, Request};
///
/// async fn get_item(req: Request) -> Result<Json<String>, DomainError> {
///     match req.param("id") {
///         Some("1") => Ok(Json("first".to_owned())),
///         _ => Err(DomainError::not_found("Item not found")),
///     }
/// }
/// ```
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for Response {
    fn into_outcome(self) -> Outcome {
        Ok(self)
    }
}

impl IntoOutcome for StatusCode {
    fn into_outcome(self) -> Outcome {
        Ok(self.into_response())
    }
}

impl IntoOutcome for &'static str {
    fn into_outcome(self) -> Outcome {
        Ok(self.into_response())
    }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> Outcome {
        Ok(self.into_response())
    }
}

impl<T> IntoOutcome for Json<T>
where
    T: Serialize + Send + 'static,
{
    fn into_outcome(self) -> Outcome {
        Response::builder().serialize(self.0).map_err(Into::into)
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Outcome {
        self.map_err(Into::into).and_then(IntoOutcome::into_outcome)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::cbor::UtcTimestamp;

    #[test]
    fn builder_sets_type_and_headers() {
        let response = Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/items/1")
            .header("bad header", "x")
            .json(&b"{}"[..]);
        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert_eq!(response.content_type(), Some(media::JSON));
        assert_eq!(response.headers()["location"], "/items/1");
        assert_eq!(response.headers().len(), 2);
    }

    #[test]
    fn into_http_sets_length() {
        let http = Response::text("hello").into_http();
        assert_eq!(http.headers()[CONTENT_LENGTH], "5");
        assert_eq!(http.status(), StatusCode::OK);
    }

    #[test]
    fn json_keeps_typed_renderer() {
        #[derive(Serialize)]
        struct Stamp {
            at: UtcTimestamp,
        }
        let at = UtcTimestamp(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        let response = Json(Stamp { at }).into_outcome().unwrap();

        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body, json!({"at": "2024-01-02T03:04:05.000Z"}));

        let cbor = (response.cbor.unwrap())().unwrap();
        let value: ciborium::Value = ciborium::de::from_reader(cbor.as_slice()).unwrap();
        let map = value.as_map().unwrap();
        assert!(matches!(map[0].1, ciborium::Value::Tag(1, _)));
    }

    #[test]
    fn result_errors_become_boxed() {
        let ok: Result<&'static str, std::io::Error> = Ok("fine");
        assert_eq!(ok.into_outcome().unwrap().body().as_ref(), b"fine");

        let err: Result<Response, std::io::Error> = Err(std::io::Error::other("boom"));
        assert_eq!(err.into_outcome().unwrap_err().to_string(), "boom");
    }
}
