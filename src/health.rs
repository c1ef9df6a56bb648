//! Health probe.
//!
//! Registered at `GET /health` unless the application routes that path
//! itself. Like any JSON endpoint it answers in CBOR when asked.

use serde_json::{Value, json};

use crate::{Json, Request};

/// Always `{"status":"healthy"}`. If the process can answer HTTP at all, it
/// is alive.
pub async fn health(_req: Request) -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
