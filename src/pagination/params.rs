//! `cursor` / `limit` query parameters.

use std::collections::HashMap;

use crate::validation::{Location, ValidationErrors, Violation};

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageParams {
    pub cursor: Option<String>,
    pub limit: usize,
}

impl Default for PageParams {
    fn default() -> Self {
        Self { cursor: None, limit: DEFAULT_LIMIT }
    }
}

impl PageParams {
    /// Reads `cursor` and `limit` from decoded query pairs.
    ///
    /// `limit` must be an integer in `1..=100`; it defaults to 20.
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, ValidationErrors> {
        let cursor = query.get("cursor").filter(|c| !c.is_empty()).cloned();

        let Some(raw) = query.get("limit") else {
            return Ok(Self { cursor, limit: DEFAULT_LIMIT });
        };

        let location = Location::query().key("limit");
        let limit: i64 = raw.trim().parse().map_err(|_| {
            Violation::new(location.clone(), "Input should be a valid integer").with_input(raw.as_str())
        })?;

        if limit < 1 {
            return Err(Violation::new(location, "Input should be greater than or equal to 1")
                .with_input(raw.as_str())
                .into());
        }
        if limit > MAX_LIMIT as i64 {
            return Err(Violation::new(location, format!("Input should be less than or equal to {MAX_LIMIT}"))
                .with_input(raw.as_str())
                .into());
        }

        Ok(Self { cursor, limit: limit as usize })
    }
}
