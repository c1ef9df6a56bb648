//! Error types.
//!
//! Two families live here. [`Error`] surfaces infrastructure failures:
//! binding, accepting, or a client that went away mid-request. [`ApiError`]
//! is everything that ends a request with a problem document; handlers may
//! also return their own error types, which reach the
//! [`ProblemRegistry`](crate::problem::ProblemRegistry) as [`BoxError`].

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use thiserror::Error;
use tracing::{error, warn};

use crate::envelope::TranscodeError;
use crate::pagination::CursorError;
use crate::problem::{ProblemDocument, ProblemResponse};
use crate::validation::ValidationErrors;

/// Type-erased handler error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Infrastructure failures from the server loop and body reading.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    Addr(String),

    /// The client stopped sending before the body was complete. No response
    /// is written.
    #[error("client disconnected while sending the request body: {0}")]
    Disconnected(String),
}

/// A failure with HTTP semantics raised by a collaborator, such as a missing
/// or duplicate resource. Optional headers (e.g. `Retry-After`) are copied
/// onto the problem response.
#[derive(Clone, Debug, Error)]
#[error("{detail}")]
pub struct DomainError {
    pub status: StatusCode,
    pub title: Option<String>,
    pub detail: String,
    pub headers: HeaderMap,
}

impl DomainError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self { status, title: None, detail: detail.into(), headers: HeaderMap::new() }
    }

    /// 404. An empty detail becomes "Resource not found".
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, or_default(detail.into(), "Resource not found"))
    }

    /// 409. An empty detail becomes "Resource conflict".
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, or_default(detail.into(), "Resource conflict"))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Adds a response header. Invalid names or values are dropped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            self.headers.insert(name, value);
        }
        self
    }
}

fn or_default(detail: String, default: &str) -> String {
    if detail.is_empty() { default.to_owned() } else { detail }
}

/// Every failure the pipeline itself knows how to present.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 415: body sent with a Content-Type other than JSON or CBOR.
    #[error("Content-Type '{content_type}' not supported. Use: {allowed}")]
    UnsupportedMediaType { content_type: String, allowed: String },

    /// 400: a CBOR body that did not decode to something JSON can hold.
    #[error("Failed to decode CBOR: {0}")]
    InvalidCbor(String),

    /// 413
    #[error("Request body too large")]
    PayloadTooLarge,

    /// 422
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// 400: a malformed request parameter, not a body-schema violation.
    #[error(transparent)]
    InvalidCursor(#[from] CursorError),

    /// 404 / 409 and friends.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Any other status a collaborator wants to surface.
    #[error("{detail}")]
    Http { status: StatusCode, detail: String },

    /// 500. The message is logged, never sent.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn http(status: StatusCode, detail: impl Into<String>) -> Self {
        Self::Http { status, detail: detail.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::InvalidCbor(_) | Self::InvalidCursor(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Domain(e) => e.status,
            Self::Http { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps the error to its problem document.
    pub fn to_problem(&self) -> ProblemResponse {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "client error");
        }

        match self {
            Self::UnsupportedMediaType { .. } => {
                ProblemDocument::new(status, self.to_string()).with_title("Unsupported Media Type").into()
            }
            Self::InvalidCbor(_) => ProblemDocument::new(status, self.to_string()).with_title("Invalid CBOR").into(),
            Self::PayloadTooLarge => ProblemDocument::new(status, self.to_string()).into(),
            Self::Validation(errors) => ProblemDocument::new(status, "validation failed")
                .with_errors(errors.to_field_errors())
                .into(),
            Self::InvalidCursor(e) => ProblemDocument::new(status, e.to_string()).into(),
            Self::Domain(e) => {
                let mut document = ProblemDocument::new(status, e.detail.clone());
                if let Some(title) = &e.title {
                    document.title = title.clone();
                }
                ProblemResponse { document, headers: e.headers.clone() }
            }
            Self::Http { detail, .. } => ProblemDocument::new(status, detail.clone()).into(),
            Self::Internal(_) => ProblemDocument::internal().into(),
        }
    }
}

impl From<TranscodeError> for ApiError {
    fn from(e: TranscodeError) -> Self {
        match e {
            TranscodeError::UnsupportedMediaType { content_type } => Self::UnsupportedMediaType {
                content_type,
                allowed: crate::media::ALLOWED_CONTENT_TYPES.join(", "),
            },
            TranscodeError::InvalidCbor(msg) => Self::InvalidCbor(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_media_type_lists_allowed_sorted() {
        let err = ApiError::from(TranscodeError::UnsupportedMediaType { content_type: "text/plain".into() });
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let problem = err.to_problem().document;
        assert_eq!(problem.title, "Unsupported Media Type");
        assert_eq!(
            problem.detail,
            "Content-Type 'text/plain' not supported. Use: application/cbor, application/json"
        );
    }

    #[test]
    fn invalid_cbor_is_400() {
        let problem = ApiError::InvalidCbor("eof".into()).to_problem().document;
        assert_eq!((problem.status, problem.title.as_str()), (400, "Invalid CBOR"));
        assert_eq!(problem.detail, "Failed to decode CBOR: eof");
    }

    #[test]
    fn domain_defaults_and_headers() {
        let err = DomainError::not_found("");
        assert_eq!(err.detail, "Resource not found");

        let err = DomainError::conflict("Profile already exists").with_header("retry-after", "30");
        let problem = ApiError::from(err).to_problem();
        assert_eq!(problem.status(), StatusCode::CONFLICT);
        assert_eq!(problem.document.title, "Conflict");
        assert_eq!(problem.headers["retry-after"], "30");
    }

    #[test]
    fn internal_does_not_leak() {
        let problem = ApiError::internal("db password is hunter2").to_problem().document;
        assert_eq!(problem, ProblemDocument::internal());
    }

    #[test]
    fn cursor_errors_are_bad_request() {
        let err = ApiError::from(CursorError::Malformed);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_problem().document.detail, "invalid cursor format");
    }
}
