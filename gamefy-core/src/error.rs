//! Error types for the GameFy calendar core.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur in calendar operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The external feed could not be fetched or is not an iCalendar stream.
    #[error("Calendar feed unavailable: {0}")]
    FeedUnavailable(String),

    /// A single VEVENT is missing required data. Never surfaced by `expand`;
    /// the entry is logged and skipped.
    #[error("Malformed feed entry: {0}")]
    MalformedEntry(String),

    #[error("Invalid window: end {end} precedes start {start}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for calendar operations.
pub type CoreResult<T> = Result<T, CoreError>;
