//! Request ids: echoed from `X-Request-ID` or freshly generated.

use std::fmt;

use http::{HeaderMap, HeaderValue};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Upper bound on an echoed id; longer values are replaced.
const MAX_LEN: usize = 200;

/// The id of the request being served. Stored in request extensions before
/// any handler runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    /// Echoes a usable incoming `X-Request-ID`, or generates a UUID v4.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_LEN)
            .map(|id| Self(id.to_owned()))
            .unwrap_or_else(Self::generate)
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn header_value(&self) -> HeaderValue {
        // Echoed ids came from a valid header value, generated ones are hex.
        HeaderValue::from_str(&self.0).unwrap_or_else(|_| HeaderValue::from_static("invalid"))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_incoming() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("  abc-123 "));
        assert_eq!(RequestId::from_headers(&headers).as_str(), "abc-123");
    }

    #[test]
    fn generates_when_missing_or_unusable() {
        let id = RequestId::from_headers(&HeaderMap::new());
        assert!(Uuid::parse_str(id.as_str()).is_ok());

        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID, HeaderValue::from_str(&"x".repeat(500)).unwrap());
        assert_ne!(RequestId::from_headers(&headers).as_str().len(), 500);
    }
}
