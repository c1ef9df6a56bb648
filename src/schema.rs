//! Read-only JSON Schema registry and the `/schemas/{name}` route.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ApiError, DomainError};
use crate::media;
use crate::problem::error_model_schema;
use crate::request::Request;
use crate::response::Response;

const ERROR_MODEL: &str = "ErrorModel";

/// Schemas by name, fixed once built. Share it behind an `Arc`.
#[derive(Clone, Debug)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Value>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder { schemas: BTreeMap::new() }
    }

    /// Reads `components.schemas` from an OpenAPI document.
    pub fn from_openapi(document: &Value) -> Self {
        let mut builder = Self::builder();
        if let Some(schemas) = document.pointer("/components/schemas").and_then(Value::as_object) {
            for (name, schema) in schemas {
                builder = builder.schema(name.clone(), schema.clone());
            }
        }
        builder.build()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builder().build()
    }
}

pub struct SchemaRegistryBuilder {
    schemas: BTreeMap<String, Value>,
}

impl SchemaRegistryBuilder {
    pub fn schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.schemas.insert(name.into(), schema);
        self
    }

    /// Adds `ErrorModel` unless a schema of that name was supplied.
    pub fn build(mut self) -> SchemaRegistry {
        self.schemas.entry(ERROR_MODEL.to_owned()).or_insert_with(error_model_schema);
        SchemaRegistry { schemas: self.schemas }
    }
}

/// `GET /schemas/{name}`, with or without a `.json` suffix.
pub(crate) async fn serve(registry: Arc<SchemaRegistry>, req: Request) -> Result<Response, ApiError> {
    let raw = req.param("name").unwrap_or_default();
    let name = raw.strip_suffix(".json").unwrap_or(raw);

    let Some(schema) = registry.get(name) else {
        return Err(DomainError::not_found(format!("Schema '{name}' not found"))
            .with_title("Schema not found")
            .into());
    };

    let body = serde_json::to_vec(schema).map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Response::builder().bytes(media::SCHEMA_JSON, body))
}
