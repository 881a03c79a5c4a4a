//! Error types for the audit layer

use thiserror::Error;

/// Error type for audit layer operations
#[derive(Error, Debug)]
pub enum AuditError {
    /// Database connection or operation error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// No snapshot satisfies the query, or the entity is tombstoned there
    #[error("Not found: {0}")]
    NotFound(String),

    /// Lifeline violation or unit-of-work misuse
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for audit layer operations
pub type Result<T> = std::result::Result<T, AuditError>;
