//! RFC 9457 problem details.
//!
//! [`ProblemDocument`] is the wire document. [`ProblemResponse`] pairs it with
//! the extra headers a mapped error wants on the response. The
//! [`ProblemPipeline`] turns any handler error into one of these, runs the
//! post-hooks over it, and renders it as JSON or CBOR.

mod hooks;
mod pipeline;
mod registry;

pub use hooks::{
    HookError, PostHook, RequestIdHeader, SchemaLink, StripAboutBlankType, StripExtras,
    MANDATORY_FIELDS,
};
pub use pipeline::{ProblemContext, ProblemPipeline, ProblemPipelineBuilder};
pub use registry::ProblemRegistry;

use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Default problem type; omitted from documents on the wire.
pub const ABOUT_BLANK: &str = "about:blank";

/// Path of the problem document's JSON Schema.
pub const ERROR_SCHEMA_PATH: &str = "/schemas/ErrorModel.json";

/// One entry of a validation problem's `errors` array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub location: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// A problem details document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProblemDocument {
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_uri: Option<String>,

    pub title: String,
    pub status: u16,
    pub detail: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,

    /// Extension members.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl ProblemDocument {
    /// A document with `type: about:blank` and the status's reason phrase as
    /// title.
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            schema: None,
            type_uri: Some(ABOUT_BLANK.to_owned()),
            title: status.canonical_reason().unwrap_or("Error").to_owned(),
            status: status.as_u16(),
            detail: detail.into(),
            instance: None,
            errors: None,
            extensions: Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// The fixed document for errors nobody registered a mapping for. It
    /// never carries anything from the error itself.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "An unexpected error occurred")
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// A mapped problem plus the headers it should be sent with.
#[derive(Clone, Debug)]
pub struct ProblemResponse {
    pub document: ProblemDocument,
    pub headers: HeaderMap,
}

impl ProblemResponse {
    pub fn status(&self) -> StatusCode {
        self.document.status_code()
    }
}

impl From<ProblemDocument> for ProblemResponse {
    fn from(document: ProblemDocument) -> Self {
        Self { document, headers: HeaderMap::new() }
    }
}

/// JSON Schema for [`ProblemDocument`], served as `ErrorModel`.
pub fn error_model_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "ErrorModel",
        "type": "object",
        "required": ["title", "status", "detail"],
        "properties": {
            "$schema": { "type": "string", "format": "uri" },
            "type": { "type": "string", "format": "uri", "default": ABOUT_BLANK },
            "title": { "type": "string" },
            "status": { "type": "integer", "minimum": 100, "maximum": 599 },
            "detail": { "type": "string" },
            "instance": { "type": "string" },
            "errors": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["location", "message"],
                    "properties": {
                        "location": { "type": "string" },
                        "message": { "type": "string" },
                        "value": {}
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_schema_key_and_skips_empty_members() {
        let mut doc = ProblemDocument::new(StatusCode::NOT_FOUND, "Profile not found");
        doc.type_uri = None;
        doc.schema = Some("http://api.test/schemas/ErrorModel.json".into());

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({
                "$schema": "http://api.test/schemas/ErrorModel.json",
                "title": "Not Found",
                "status": 404,
                "detail": "Profile not found",
            })
        );
    }

    #[test]
    fn extensions_flatten() {
        let doc = ProblemDocument::new(StatusCode::CONFLICT, "dup").with_extension("retry", 3);
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["retry"], 3);
        assert_eq!(value["type"], ABOUT_BLANK);
    }

    #[test]
    fn internal_is_fixed() {
        let doc = ProblemDocument::internal();
        assert_eq!(doc.status, 500);
        assert_eq!(doc.title, "Internal Server Error");
        assert_eq!(doc.detail, "An unexpected error occurred");
    }
}
