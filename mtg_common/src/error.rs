//! Error types for mtg_common

use thiserror::Error;

/// Unified error type for card metadata operations
#[derive(Debug, Error)]
pub enum MtgError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Failed to parse JSON response or cache file
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// HTTP error status code
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),
    /// Cache file I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Scryfall bulk-data index did not list the requested dataset
    #[error("Scryfall bulk dataset not found: {0}")]
    BulkDataMissing(String),
}

/// Result alias for mtg_common operations
pub type Result<T> = std::result::Result<T, MtgError>;
