//! Request-level import errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ImportResponse;

/// One field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Path of the offending field, e.g. `data.artworks[3].lat`.
    pub field: String,
    pub message: String,
    /// Machine-readable code, e.g. `out_of_range`.
    pub code: String,
}

/// Every validation problem found in a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("request validation failed with {} error(s)", .errors.len())]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, code: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
            code: code.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when some error refers to `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

/// Errors that end an import request as a whole.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The request was rejected before any record was touched.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// The time budget ran out; `partial` holds what was recorded.
    #[error("import time budget of {budget_secs}s exceeded after {processed} record(s)")]
    BudgetExceeded {
        budget_secs: u64,
        processed: u32,
        partial: Box<ImportResponse>,
    },

    /// The catalog could not be reached. `partial` is set when it went away
    /// after some records were already recorded.
    #[error("catalog unavailable: {reason}")]
    CatalogUnavailable {
        reason: String,
        partial: Option<Box<ImportResponse>>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ImportError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::BudgetExceeded { .. } => "time_budget_exceeded",
            Self::CatalogUnavailable { .. } => "catalog_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }
}
