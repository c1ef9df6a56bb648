//! Post-hooks: transforms applied to every mapped problem before encoding.

use http::HeaderValue;
use http::header::LINK;
use serde_json::Value;
use thiserror::Error;

use super::pipeline::ProblemContext;
use super::{ABOUT_BLANK, ERROR_SCHEMA_PATH, ProblemDocument, ProblemResponse};
use crate::middleware::request_id::X_REQUEST_ID;

/// Members kept in stripped 5xx documents.
pub const MANDATORY_FIELDS: [&str; 5] = ["$schema", "title", "status", "detail", "errors"];

#[derive(Debug, Error)]
#[error("{0}")]
pub struct HookError(String);

impl HookError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// One `(problem, context) -> problem` transform.
///
/// A hook that fails leaves the problem exactly as it found it; the
/// pipeline logs the failure and moves on to the next hook.
pub trait PostHook: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, problem: &mut ProblemResponse, ctx: &ProblemContext) -> Result<(), HookError>;
}

/// Copies the request id onto the response as `X-Request-ID`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestIdHeader;

impl PostHook for RequestIdHeader {
    fn name(&self) -> &'static str {
        "request-id"
    }

    fn apply(&self, problem: &mut ProblemResponse, ctx: &ProblemContext) -> Result<(), HookError> {
        let Some(id) = ctx.request_id.as_deref() else {
            return Ok(());
        };
        let value = HeaderValue::from_str(id).map_err(|e| HookError::new(format!("request id: {e}")))?;
        problem.headers.insert(X_REQUEST_ID, value);
        Ok(())
    }
}

/// Drops `type` when it is the `about:blank` default.
#[derive(Clone, Copy, Debug, Default)]
pub struct StripAboutBlankType;

impl PostHook for StripAboutBlankType {
    fn name(&self) -> &'static str {
        "strip-about-blank"
    }

    fn apply(&self, problem: &mut ProblemResponse, _: &ProblemContext) -> Result<(), HookError> {
        if problem.document.type_uri.as_deref() == Some(ABOUT_BLANK) {
            problem.document.type_uri = None;
        }
        Ok(())
    }
}

/// Points the document at its JSON Schema: an absolute `$schema` member
/// (unless one is already set) and a `rel="describedBy"` link.
#[derive(Clone, Copy, Debug, Default)]
pub struct SchemaLink;

impl PostHook for SchemaLink {
    fn name(&self) -> &'static str {
        "schema-link"
    }

    fn apply(&self, problem: &mut ProblemResponse, ctx: &ProblemContext) -> Result<(), HookError> {
        if problem.document.schema.is_none() {
            let base = ctx.base_url.trim_end_matches('/');
            problem.document.schema = Some(format!("{base}{ERROR_SCHEMA_PATH}"));
        }
        problem.headers.insert(
            LINK,
            HeaderValue::from_static(r#"</schemas/ErrorModel.json>; rel="describedBy""#),
        );
        Ok(())
    }
}

/// Reduces gateway and server-error documents to [`MANDATORY_FIELDS`].
/// Disabled outside production.
#[derive(Clone, Copy, Debug)]
pub struct StripExtras {
    pub enabled: bool,
}

impl StripExtras {
    const STATUSES: [u16; 4] = [500, 502, 503, 504];
}

impl PostHook for StripExtras {
    fn name(&self) -> &'static str {
        "strip-extras"
    }

    fn apply(&self, problem: &mut ProblemResponse, _: &ProblemContext) -> Result<(), HookError> {
        if !self.enabled || !Self::STATUSES.contains(&problem.document.status) {
            return Ok(());
        }

        let mut value = serde_json::to_value(&problem.document).map_err(|e| HookError::new(e.to_string()))?;
        if let Value::Object(members) = &mut value {
            members.retain(|key, _| MANDATORY_FIELDS.contains(&key.as_str()));
        }
        problem.document =
            serde_json::from_value::<ProblemDocument>(value).map_err(|e| HookError::new(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;

    fn ctx() -> ProblemContext {
        ProblemContext {
            accept: String::new(),
            request_id: Some("req-1".into()),
            base_url: "https://api.example.com/".into(),
        }
    }

    fn problem(status: StatusCode) -> ProblemResponse {
        ProblemDocument::new(status, "detail").into()
    }

    #[test]
    fn request_id_header() {
        let mut p = problem(StatusCode::NOT_FOUND);
        RequestIdHeader.apply(&mut p, &ctx()).unwrap();
        assert_eq!(p.headers[X_REQUEST_ID], "req-1");

        let bad = ProblemContext { request_id: Some("bad\nid".into()), ..ctx() };
        assert!(RequestIdHeader.apply(&mut problem(StatusCode::NOT_FOUND), &bad).is_err());
    }

    #[test]
    fn about_blank_removed_custom_type_kept() {
        let mut p = problem(StatusCode::NOT_FOUND);
        StripAboutBlankType.apply(&mut p, &ctx()).unwrap();
        assert_eq!(p.document.type_uri, None);

        let mut p = problem(StatusCode::NOT_FOUND);
        p.document.type_uri = Some("https://errors.example.com/gone".into());
        StripAboutBlankType.apply(&mut p, &ctx()).unwrap();
        assert_eq!(p.document.type_uri.as_deref(), Some("https://errors.example.com/gone"));
    }

    #[test]
    fn schema_link_is_absolute_and_respects_existing() {
        let mut p = problem(StatusCode::BAD_REQUEST);
        SchemaLink.apply(&mut p, &ctx()).unwrap();
        assert_eq!(p.document.schema.as_deref(), Some("https://api.example.com/schemas/ErrorModel.json"));
        assert_eq!(p.headers[LINK], r#"</schemas/ErrorModel.json>; rel="describedBy""#);

        let mut p = problem(StatusCode::BAD_REQUEST);
        p.document.schema = Some("urn:custom".into());
        SchemaLink.apply(&mut p, &ctx()).unwrap();
        assert_eq!(p.document.schema.as_deref(), Some("urn:custom"));
        assert!(p.headers.contains_key(LINK));
    }

    #[test]
    fn strip_extras_only_on_5xx_in_production() {
        let noisy = |status| {
            let mut p = problem(status);
            p.document.instance = Some("/items/1".into());
            p.document.extensions.insert("trace".into(), "stack".into());
            p
        };

        let mut p = noisy(StatusCode::SERVICE_UNAVAILABLE);
        StripExtras { enabled: true }.apply(&mut p, &ctx()).unwrap();
        assert_eq!(p.document.type_uri, None);
        assert_eq!(p.document.instance, None);
        assert!(p.document.extensions.is_empty());
        assert_eq!(p.document.detail, "detail");

        let mut p = noisy(StatusCode::CONFLICT);
        StripExtras { enabled: true }.apply(&mut p, &ctx()).unwrap();
        assert!(p.document.instance.is_some());

        let mut p = noisy(StatusCode::INTERNAL_SERVER_ERROR);
        StripExtras { enabled: false }.apply(&mut p, &ctx()).unwrap();
        assert!(!p.document.extensions.is_empty());
    }
}
