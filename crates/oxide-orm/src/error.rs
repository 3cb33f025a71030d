//! Error types for the ORM.

use oxide_changeset::{ValidationErrors, ValueError};
use thiserror::Error;

/// Boxed error raised by an adapter's driver.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// ORM-specific errors.
#[derive(Debug, Error)]
pub enum OrmError {
    /// A changeset handed to the repository was invalid.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// No record matched the query.
    #[error("{0}")]
    NotFound(String),

    /// A uniqueness constraint was violated.
    #[error("{message}")]
    Duplicate {
        /// Human-readable message.
        message: String,
        /// Offending field, when the adapter can tell.
        field: Option<String>,
    },

    /// Any other adapter or driver failure.
    #[error("{message}")]
    Unexpected {
        /// Human-readable message.
        message: String,
        /// Underlying driver error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// A row value did not fit its destination field.
    #[error("value error: {0}")]
    Value(#[from] ValueError),
}

impl OrmError {
    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Creates a duplicate error.
    pub fn duplicate(message: impl Into<String>, field: Option<String>) -> Self {
        Self::Duplicate {
            message: message.into(),
            field,
        }
    }

    /// Creates an unexpected error without an underlying source.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a driver error as an unexpected error.
    #[must_use]
    pub fn from_source(source: BoxError) -> Self {
        Self::Unexpected {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Returns whether this is a not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type alias for ORM operations.
pub type Result<T> = std::result::Result<T, OrmError>;
