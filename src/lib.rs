//! # conneg
//!
//! JSON/CBOR content negotiation, RFC 9457 problem details and cursor
//! pagination for hyper services.
//!
//! Handlers deal in JSON. The layer around them:
//!
//! - decodes `application/cbor` request bodies into JSON, once per request
//! - re-encodes JSON responses as CBOR when `Accept` names `application/cbor`
//! - refuses bodies over a byte ceiling while they stream in
//! - renders every error as a problem document, in JSON or CBOR
//! - pages through ordered collections with opaque cursors and `Link` headers
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use conneg::{App, Config, DomainError, Json, Request, Router, Server};
//! use serde_json::{Value, json};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), conneg::Error> {
//!     let config = Config::from_env();
//!     let router = Router::new().get("/items/{id}", get_item);
//!     let app = App::builder(router).config(config.clone()).build();
//!
//!     Server::bind(&config.bind_addr())?.serve(app).await
//! }
//!
//! async fn get_item(req: Request) -> Result<Json<Value>, DomainError> {
//!     match req.param("id") {
//!         Some(id) if id.starts_with("item-") => Ok(Json(json!({ "id": id }))),
//!         _ => Err(DomainError::not_found("Item not found")),
//!     }
//! }
//! ```

mod app;
mod envelope;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod schema;
mod server;

pub mod cbor;
pub mod config;
pub mod health;
pub mod media;
pub mod middleware;
pub mod pagination;
pub mod problem;
pub mod validation;

pub use app::{App, AppBuilder};
pub use config::Config;
pub use envelope::{Envelope, TranscodeError};
pub use error::{ApiError, BoxError, DomainError, Error};
pub use handler::Handler;
pub use request::Request;
pub use response::{IntoOutcome, IntoResponse, Json, Outcome, Response, ResponseBuilder};
pub use router::Router;
pub use schema::{SchemaRegistry, SchemaRegistryBuilder};
pub use server::Server;
