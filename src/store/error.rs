//! Store Errors
//!
//! Error types for persistence operations.

use crate::domain::ticket::UnknownTicketStatus;
use crate::domain::DomainError;

/// Errors that can occur in the store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A row referenced by the write does not exist
    #[error("Row not found: {0}")]
    NotFound(String),

    /// A persisted value could not be mapped to a domain type
    #[error("Invalid stored data: {0}")]
    Decode(String),

    /// The write would break a domain rule
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}

impl From<UnknownTicketStatus> for StoreError {
    fn from(err: UnknownTicketStatus) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Map a sqlx write error, surfacing constraint violations as their own kinds
pub(crate) fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        let constraint = db_err.constraint().unwrap_or("unknown").to_string();
        match db_err.code().as_deref() {
            // unique_violation
            Some("23505") => return StoreError::UniqueViolation(constraint),
            // foreign_key_violation
            Some("23503") => return StoreError::NotFound(constraint),
            _ => {}
        }
    }
    StoreError::Database(err)
}

pub type StoreResult<T> = Result<T, StoreError>;
