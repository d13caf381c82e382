use thiserror::Error;

use clinicore_core::DomainError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence-layer error.
///
/// Domain failures pass through unchanged so the API can map them to the
/// right status; only genuinely storage-shaped failures get their own
/// variants.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A domain rule rejected the write (validation, invariant, ...).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The addressed row does not exist.
    #[error("not found")]
    NotFound,

    /// The write collides with existing state (e.g. duplicate enrollment).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The database failed.
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Owner-scoped resources subject to the row-level capability check.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OwnedResource {
    Patient,
    Program,
    Appointment,
    Visit,
    Prescription,
    LabOrder,
    Bill,
}

/// Result of the capability check for one (resource, id, provider) triple.
///
/// Three-way on purpose: a missing row and a row owned by someone else are
/// different answers (404 vs 403 at the HTTP layer).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied,
    NotFound,
}
