//! The error → response pipeline.
//!
//! ```text
//! error ─▶ registry ─▶ request-id ─▶ strip about:blank ─▶ $schema + Link
//!                  ─▶ custom hooks ─▶ strip 5xx extras ─▶ encode (JSON | CBOR)
//! ```
//!
//! Encoding is not a hook. It runs after the hook list by construction, so
//! no hook can mutate the document after it has been serialized.

use std::error::Error as StdError;
use std::fmt;

use bytes::Bytes;
use tracing::{error, warn};

use super::hooks::{PostHook, RequestIdHeader, SchemaLink, StripAboutBlankType, StripExtras};
use super::registry::ProblemRegistry;
use super::{ProblemDocument, ProblemResponse};
use crate::cbor;
use crate::media;
use crate::response::Response;

/// Body sent when even the problem document cannot be encoded.
const FALLBACK_BODY: &[u8] =
    br#"{"title":"Internal Server Error","status":500,"detail":"An unexpected error occurred"}"#;

/// What the pipeline knows about the failed request.
#[derive(Clone, Debug, Default)]
pub struct ProblemContext {
    /// Raw `Accept` header, empty when absent.
    pub accept: String,
    pub request_id: Option<String>,
    /// Origin used for absolute `$schema` URLs, e.g. `https://api.example.com`.
    pub base_url: String,
}

pub struct ProblemPipeline {
    registry: ProblemRegistry,
    hooks: Vec<Box<dyn PostHook>>,
}

impl ProblemPipeline {
    pub fn builder() -> ProblemPipelineBuilder {
        ProblemPipelineBuilder {
            registry: ProblemRegistry::new(),
            production: true,
            extra: Vec::new(),
        }
    }

    /// Maps `err` and runs every hook over the result.
    pub fn problem(&self, err: &(dyn StdError + 'static), ctx: &ProblemContext) -> ProblemResponse {
        let mut problem = self.registry.map(err, ctx);
        for hook in &self.hooks {
            let snapshot = problem.clone();
            if let Err(e) = hook.apply(&mut problem, ctx) {
                warn!(hook = hook.name(), error = %e, "problem post-hook failed, skipped");
                problem = snapshot;
            }
        }
        problem
    }

    /// Maps, transforms and encodes `err`. Never fails.
    pub fn render(&self, err: &(dyn StdError + 'static), ctx: &ProblemContext) -> Response {
        let problem = self.problem(err, ctx);
        encode(problem, &ctx.accept)
    }
}

impl Default for ProblemPipeline {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for ProblemPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProblemPipeline")
            .field("registry", &self.registry)
            .field("hooks", &self.hooks.iter().map(|h| h.name()).collect::<Vec<_>>())
            .finish()
    }
}

pub struct ProblemPipelineBuilder {
    registry: ProblemRegistry,
    production: bool,
    extra: Vec<Box<dyn PostHook>>,
}

impl ProblemPipelineBuilder {
    /// Replaces the default registry.
    pub fn registry(mut self, registry: ProblemRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Adds a mapping for a handler error type.
    pub fn register<E, F>(mut self, mapper: F) -> Self
    where
        E: StdError + 'static,
        F: Fn(&E, &ProblemContext) -> ProblemResponse + Send + Sync + 'static,
    {
        self.registry = self.registry.register(mapper);
        self
    }

    /// Enables stripping of 5xx documents.
    pub fn production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    /// Adds a hook after the built-in ones and before 5xx stripping.
    pub fn hook(mut self, hook: impl PostHook + 'static) -> Self {
        self.extra.push(Box::new(hook));
        self
    }

    pub fn build(self) -> ProblemPipeline {
        let mut hooks: Vec<Box<dyn PostHook>> = vec![
            Box::new(RequestIdHeader),
            Box::new(StripAboutBlankType),
            Box::new(SchemaLink),
        ];
        hooks.extend(self.extra);
        hooks.push(Box::new(StripExtras { enabled: self.production }));
        ProblemPipeline { registry: self.registry, hooks }
    }
}

/// Serializes the document, as CBOR when the client explicitly asked for it.
fn encode(problem: ProblemResponse, accept: &str) -> Response {
    let status = problem.status();
    let wants_cbor = media::wants_problem_cbor(accept);

    let encoded = serde_json::to_value(&problem.document).map_err(|e| e.to_string()).and_then(|value| {
        if wants_cbor {
            cbor::encode_json(&value)
                .map(|bytes| (media::PROBLEM_CBOR, bytes))
                .map_err(|e| e.to_string())
        } else {
            serde_json::to_vec(&value)
                .map(|bytes| (media::PROBLEM_JSON, bytes))
                .map_err(|e| e.to_string())
        }
    });

    match encoded {
        Ok((content_type, body)) => {
            let mut response = Response::builder().status(status).bytes(content_type, body);
            for (name, value) in &problem.headers {
                response.headers.append(name, value.clone());
            }
            response
        }
        Err(e) => {
            error!(error = %e, "problem document could not be encoded");
            fallback()
        }
    }
}

fn fallback() -> Response {
    let status = ProblemDocument::internal().status_code();
    Response::builder()
        .status(status)
        .bytes(media::PROBLEM_JSON, Bytes::from_static(FALLBACK_BODY))
}
