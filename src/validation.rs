//! Structured validation failures.
//!
//! A [`ValidationErrors`] collects one [`Violation`] per failing field. Each
//! violation carries the field's [`Location`] (rendered as
//! `body.items[0].name`), a message, and optionally the offending input.
//! Inputs are withheld from the client when the field's own name is on the
//! sensitive-field denylist.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::problem::FieldError;

/// Field names whose values never appear in error output.
///
/// Matched case-insensitively against the whole final path segment only:
/// `password` is redacted, `password_hint` and `user.password.length`'s
/// `length` are not.
pub const SENSITIVE_FIELD_NAMES: [&str; 10] = [
    "password",
    "token",
    "secret",
    "api_key",
    "apikey",
    "auth",
    "authorization",
    "credential",
    "credentials",
    "private_key",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Path to a field inside a request, e.g. `query.limit` or `body.items[0].name`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location(Vec<Segment>);

impl Location {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body() -> Self {
        Self::new().key("body")
    }

    pub fn query() -> Self {
        Self::new().key("query")
    }

    pub fn path() -> Self {
        Self::new().key("path")
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(Segment::Key(key.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.0.push(Segment::Index(index));
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Whether the final segment names a sensitive field.
    pub fn is_sensitive(&self) -> bool {
        match self.0.last() {
            Some(Segment::Key(name)) => SENSITIVE_FIELD_NAMES
                .iter()
                .any(|sensitive| name.eq_ignore_ascii_case(sensitive)),
            _ => false,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Index(idx) => write!(f, "[{idx}]")?,
                Segment::Key(key) if i == 0 => f.write_str(key)?,
                Segment::Key(key) => write!(f, ".{key}")?,
            }
        }
        Ok(())
    }
}

/// One failing field.
#[derive(Clone, Debug, PartialEq)]
pub struct Violation {
    pub location: Location,
    pub message: String,
    pub input: Option<Value>,
}

impl Violation {
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self { location, message: message.into(), input: None }
    }

    pub fn with_input(mut self, input: impl Into<Value>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Client-facing form. The input is dropped for sensitive fields.
    pub fn to_field_error(&self) -> FieldError {
        FieldError {
            location: self.location.to_string(),
            message: self.message.clone(),
            value: if self.location.is_sensitive() { None } else { self.input.clone() },
        }
    }
}

/// Every violation found while validating one request.
#[derive(Clone, Debug, Default, Error, PartialEq)]
#[error("validation failed")]
pub struct ValidationErrors(Vec<Violation>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(violation: Violation) -> Self {
        Self(vec![violation])
    }

    pub fn push(&mut self, violation: Violation) {
        self.0.push(violation);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    /// `Ok(())` when nothing was collected, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    pub fn to_field_errors(&self) -> Vec<FieldError> {
        self.0.iter().map(Violation::to_field_error).collect()
    }
}

impl From<Violation> for ValidationErrors {
    fn from(violation: Violation) -> Self {
        Self::single(violation)
    }
}
