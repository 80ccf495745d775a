//! Error types for graph operations.

use noema_schema::SchemaError;

use crate::store::StoreError;

/// Failure of a single graph operation.
///
/// Validation and argument errors are raised before any store interaction;
/// store failures abort the enclosing transaction and surface here
/// unretried.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Validation failed: {}", violations.join("; "))]
    ValidationFailed { violations: Vec<String> },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GraphError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
