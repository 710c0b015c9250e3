//! Error types for FileCabinet
//!
//! Provides a unified error type for all operations.
//!
//! "Not found" is deliberately absent: lookups and removals report a missing
//! id as `Ok(false)`, `Ok(None)` or an empty result.

use thiserror::Error;

use crate::query::QueryError;
use crate::validation::ValidationError;

/// Result type alias using CabinetError
pub type Result<T> = std::result::Result<T, CabinetError>;

/// Unified error type for FileCabinet operations
#[derive(Debug, Error)]
pub enum CabinetError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Record #{0} already exists")]
    DuplicateId(i32),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Integrity check failed for slot at offset {offset}; slot marked deleted")]
    Integrity { offset: u64 },

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Query Errors
    // -------------------------------------------------------------------------
    #[error("Invalid query: {0}")]
    Query(#[from] QueryError),

    // -------------------------------------------------------------------------
    // Import/Export Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    // -------------------------------------------------------------------------
    // Command Errors
    // -------------------------------------------------------------------------
    #[error("{0}")]
    InvalidCommand(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CabinetError {
    /// True for failures caused by user input rather than the environment.
    ///
    /// The command layer turns these into "invalid parameters" replies instead
    /// of aborting.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            CabinetError::Validation(_)
                | CabinetError::DuplicateId(_)
                | CabinetError::Query(_)
                | CabinetError::Snapshot(_)
                | CabinetError::InvalidCommand(_)
        )
    }
}
