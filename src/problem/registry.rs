//! Error type → problem document mapping.

use std::error::Error as StdError;
use std::fmt;

use tracing::error;

use super::pipeline::ProblemContext;
use super::{ProblemDocument, ProblemResponse};
use crate::envelope::TranscodeError;
use crate::error::{ApiError, DomainError};
use crate::pagination::CursorError;
use crate::validation::ValidationErrors;

type Mapper =
    Box<dyn Fn(&(dyn StdError + 'static), &ProblemContext) -> Option<ProblemResponse> + Send + Sync>;

/// Ordered table of error mappers, each keyed on a concrete error type.
///
/// Lookup walks the error's `source()` chain and, at each link, tries the
/// mappers in registration order; the first hit wins. Errors nobody maps
/// become [`ProblemDocument::internal`].
pub struct ProblemRegistry {
    mappers: Vec<(&'static str, Mapper)>,
}

impl ProblemRegistry {
    /// A registry with no mappings at all.
    pub fn empty() -> Self {
        Self { mappers: Vec::new() }
    }

    /// A registry mapping every error type this crate raises.
    pub fn new() -> Self {
        Self::empty()
            .register(|e: &ApiError, _| e.to_problem())
            .register(|e: &DomainError, _| ApiError::Domain(e.clone()).to_problem())
            .register(|e: &ValidationErrors, _| ApiError::Validation(e.clone()).to_problem())
            .register(|e: &CursorError, _| ApiError::InvalidCursor(e.clone()).to_problem())
            .register(|e: &TranscodeError, _| ApiError::from(e.clone()).to_problem())
    }

    /// Adds a mapper for errors of type `E`.
    pub fn register<E, F>(mut self, mapper: F) -> Self
    where
        E: StdError + 'static,
        F: Fn(&E, &ProblemContext) -> ProblemResponse + Send + Sync + 'static,
    {
        let erased: Mapper = Box::new(move |err, ctx| err.downcast_ref::<E>().map(|e| mapper(e, ctx)));
        self.mappers.push((std::any::type_name::<E>(), erased));
        self
    }

    pub fn map(&self, err: &(dyn StdError + 'static), ctx: &ProblemContext) -> ProblemResponse {
        let mut current = Some(err);
        while let Some(link) = current {
            if let Some(problem) = self.mappers.iter().find_map(|(_, mapper)| mapper(link, ctx)) {
                return problem;
            }
            current = link.source();
        }

        error!(error = %err, request_id = ctx.request_id.as_deref().unwrap_or("-"), "unhandled error");
        ProblemDocument::internal().into()
    }
}

impl Default for ProblemRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProblemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.mappers.iter().map(|(name, _)| name)).finish()
    }
}
