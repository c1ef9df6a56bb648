//! Composition root.
//!
//! Every request passes the same stages, outermost first:
//!
//! ```text
//! body limit ─▶ request id ─▶ span ─▶ route ─▶ transcoder(handler)
//!                                        │            │ error
//!                                        └─ 404/405 ──┴──▶ problem pipeline
//!                                                           │
//!                             security headers + X-Request-ID ◀┘
//! ```

use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::ACCEPT;
use http::{Method, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, Full};
use tracing::{Instrument, Span, info};

use crate::config::Config;
use crate::error::{BoxError, DomainError, Error};
use crate::middleware::body_limit::{BodyLimit, Guarded};
use crate::middleware::negotiate::ResponseTranscoder;
use crate::middleware::request_id::{RequestId, X_REQUEST_ID};
use crate::middleware::{security, trace};
use crate::problem::{PostHook, ProblemContext, ProblemPipeline, ProblemPipelineBuilder, ProblemResponse};
use crate::request::{self, Request};
use crate::router::{Route, Router};
use crate::schema::{self, SchemaRegistry};
use crate::health;

/// A router wrapped in the full negotiation and error pipeline.
pub struct App {
    router: Router,
    pipeline: ProblemPipeline,
    limit: BodyLimit,
    transcoder: ResponseTranscoder,
    config: Config,
}

impl App {
    pub fn builder(router: Router) -> AppBuilder {
        AppBuilder {
            router,
            config: Config::default(),
            schemas: SchemaRegistry::default(),
            pipeline: ProblemPipeline::builder(),
        }
    }

    /// An app with default configuration.
    pub fn new(router: Router) -> Self {
        Self::builder(router).build()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Serves one request.
    ///
    /// Only fails when the client disconnects while sending the body; every
    /// other failure becomes a problem response.
    pub async fn handle<B>(&self, req: http::Request<B>) -> Result<http::Response<Full<Bytes>>, Error>
    where
        B: Body,
        B::Error: Display,
    {
        let started = Instant::now();
        let https = security::is_https(req.headers());

        let req = match self.limit.guard(req).await? {
            Guarded::Accepted(req) => req,
            Guarded::TooLarge(mut response) => {
                security::apply(response.headers_mut(), https, self.config.debug);
                return Ok(response);
            }
        };

        let (mut parts, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        let request_id = RequestId::from_headers(&parts.headers);
        parts.extensions.insert(request_id.clone());
        let span = trace::request_span(&parts.method, parts.uri.path(), &request_id, &parts.headers);

        async move {
            let ctx = ProblemContext {
                accept: parts.headers.get(ACCEPT).and_then(|v| v.to_str().ok()).unwrap_or_default().to_owned(),
                request_id: Some(request_id.to_string()),
                base_url: request::base_url(&parts.headers, &parts.uri, self.config.public_base_url.as_deref()),
            };

            let outcome: Result<_, BoxError> = match self.router.lookup(&parts.method, parts.uri.path()) {
                Route::Found(handler, params) => {
                    let req = Request::new(parts, body, params, ctx.base_url.clone());
                    self.transcoder.call(&handler, req).await
                }
                Route::MethodNotAllowed(allowed) => Err(method_not_allowed(&parts.method, &allowed).into()),
                Route::NotFound => {
                    Err(DomainError::not_found(format!("No route matches '{}'", parts.uri.path())).into())
                }
            };

            let mut response = outcome.unwrap_or_else(|err| self.pipeline.render(&*err, &ctx));
            security::apply(response.headers_mut(), https, self.config.debug);
            response.headers_mut().insert(X_REQUEST_ID, request_id.header_value());

            let status = response.status_code();
            Span::current().record("status", status.as_u16());
            info!(status = status.as_u16(), latency_ms = millis(started.elapsed()), "request completed");
            Ok(response.into_http())
        }
        .instrument(span)
        .await
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn method_not_allowed(method: &Method, allowed: &[Method]) -> DomainError {
    let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
    DomainError::new(StatusCode::METHOD_NOT_ALLOWED, format!("Method {method} not allowed"))
        .with_header("allow", &allow)
}

pub struct AppBuilder {
    router: Router,
    config: Config,
    schemas: SchemaRegistry,
    pipeline: ProblemPipelineBuilder,
}

impl AppBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn schemas(mut self, schemas: SchemaRegistry) -> Self {
        self.schemas = schemas;
        self
    }

    /// Maps a handler error type to its problem document.
    pub fn register<E, F>(mut self, mapper: F) -> Self
    where
        E: std::error::Error + 'static,
        F: Fn(&E, &ProblemContext) -> ProblemResponse + Send + Sync + 'static,
    {
        self.pipeline = self.pipeline.register(mapper);
        self
    }

    /// Adds a problem post-hook after the built-in ones and before 5xx stripping.
    pub fn hook(mut self, hook: impl PostHook + 'static) -> Self {
        self.pipeline = self.pipeline.hook(hook);
        self
    }

    pub fn build(self) -> App {
        let schemas = Arc::new(self.schemas);
        let mut router = self.router;
        router.insert_default(Method::GET, "/health", health::health);
        router.insert_default(Method::GET, "/schemas/{name}", move |req: Request| {
            schema::serve(Arc::clone(&schemas), req)
        });

        App {
            router,
            pipeline: self.pipeline.production(self.config.is_production()).build(),
            limit: BodyLimit::new(self.config.max_request_size),
            transcoder: ResponseTranscoder,
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_saturates_instead_of_wrapping() {
        assert_eq!(millis(Duration::from_micros(2_500)), 2);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
