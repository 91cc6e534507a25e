//! Analytics error types.

use thiserror::Error;

/// Errors that can occur at the edges of analytics calculations.
///
/// Model functions report missing data as `None`; these errors cover fit
/// rejection, athlete validation, and cache I/O.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Insufficient data to perform calculation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Calculation failed.
    #[error("Calculation failed: {0}")]
    CalculationFailed(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    StorageError(#[from] rusqlite::Error),

    /// Cached payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for analytics operations.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
