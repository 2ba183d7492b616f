//! Domain errors for the prlink linking system.

use thiserror::Error;

/// Domain-level errors that can occur while linking pull requests and branches.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Concurrency conflict: {entity} {id} was modified")]
    ConcurrencyConflict { entity: String, id: String },

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Short machine-readable code, used in HTTP error bodies.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::RecordNotFound(_) => "record_not_found",
            Self::UnknownRecordType(_) => "unknown_record_type",
            Self::ValidationFailed(_) => "validation_failed",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::DatabaseError(_) => "database_error",
            Self::SerializationError(_) => "serialization_error",
            Self::ConcurrencyConflict { .. } => "concurrency_conflict",
            Self::ExecutionFailed(_) => "execution_failed",
        }
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
