//! Error types for Complaint Desk.

use std::time::Duration;

/// Application assembly errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Failures of a single external classifier call.
///
/// These never escape the enrichment orchestrator; they only decide which
/// fallback value ends up on the record.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Classifier {classifier} request failed: {reason}")]
    RequestFailed { classifier: String, reason: String },

    #[error("Classifier {classifier} returned HTTP {status}")]
    HttpStatus { classifier: String, status: u16 },

    #[error("Invalid response from {classifier}: {reason}")]
    InvalidResponse { classifier: String, reason: String },

    #[error("Classifier {classifier} timed out after {timeout:?}")]
    Timeout { classifier: String, timeout: Duration },

    #[error("Classifier {classifier} skipped: {reason}")]
    Skipped { classifier: String, reason: String },

    #[error("Failed to build HTTP client for {classifier}: {reason}")]
    ClientBuild { classifier: String, reason: String },
}

/// Errors surfaced to callers of the intake and query services.
#[derive(Debug, thiserror::Error)]
pub enum ComplaintError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Complaint {id} not found")]
    NotFound { id: i64 },

    #[error("Complaint {id} is {from}, cannot transition to {to}")]
    InvalidTransition { id: i64, from: String, to: String },

    #[error("Storage failure: {0}")]
    Storage(#[from] DatabaseError),
}

/// Result type alias for application assembly.
pub type Result<T> = std::result::Result<T, Error>;
