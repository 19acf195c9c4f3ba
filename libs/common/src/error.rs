//! Custom error types for the common library
//!
//! This module defines the persistence error taxonomy shared by every store
//! backend. Callers only ever need to distinguish two conditions, a missing
//! record and a uniqueness violation; everything else is opaque.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The requested record does not exist
    #[error("record not found")]
    NotFound,

    /// A write would duplicate a value declared unique
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The record violates a store invariant other than uniqueness
    #[error("invalid record: {0}")]
    Invalid(String),

    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

impl DatabaseError {
    /// Classify a query error, lifting unique violations and missing rows out
    /// of the opaque `Query` bucket.
    pub fn from_query(err: SqlxError) -> Self {
        match err {
            SqlxError::RowNotFound => DatabaseError::NotFound,
            SqlxError::Database(ref db_err) if db_err.is_unique_violation() => {
                DatabaseError::Constraint(db_err.message().to_string())
            }
            other => DatabaseError::Query(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound)
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, DatabaseError::Constraint(_))
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
