//! Middleware layer.
//!
//! The stages [`App`](crate::App) composes around every handler, outermost
//! first:
//!
//! - [`body_limit`]: streaming request-body ceiling, its own 413
//! - [`request_id`]: `X-Request-ID` echo or generation
//! - [`trace`]: per-request span with method, path, request and trace ids
//! - [`negotiate`]: CBOR request bodies in, CBOR responses out on request
//! - [`security`]: baseline security response headers

pub mod body_limit;
pub mod negotiate;
pub mod request_id;
pub mod security;
pub mod trace;

pub use body_limit::{BodyLimit, Guarded};
pub use negotiate::ResponseTranscoder;
pub use request_id::RequestId;
