//! Error types for mtga_collection

use thiserror::Error;

/// Unified error type for mtga_collection operations
#[derive(Debug, Error)]
pub enum CollectionError {
    /// File I/O failed (including lock contention that outlived the retry schedule)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse or serialize JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Datastore operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// CSV output failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Card metadata lookup failed
    #[error("Card metadata error: {0}")]
    Metadata(#[from] mtg_common::MtgError),
    /// Deck definition file has the wrong shape
    #[error("Invalid deck file: {0}")]
    InvalidDeck(String),
    /// Out-of-contract numeric input (e.g. hypergeometric parameters)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Unparseable relative time or date
    #[error("Invalid time filter: {0}")]
    InvalidTime(String),
    /// The log contained nothing the command could use
    #[error("{0}")]
    NoLogData(String),
}

/// Result alias for mtga_collection operations
pub type Result<T> = std::result::Result<T, CollectionError>;
