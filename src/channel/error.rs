//! Channel error types
//!
//! Defines all error conditions surfaced by channel operations and the catalog.

use crate::query::QueryError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur in channel operations
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Persistence failed; nothing was written or removed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Query parameters could not be interpreted
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// No channel kind is registered under this tag
    #[error("'{0}' is not a valid channel type")]
    InvalidChannelType(String),

    /// No channel record with this id
    #[error("Channel not found: {0}")]
    ChannelNotFound(i64),

    /// The channel kind refused a reading
    #[error("Invalid reading: {0}")]
    InvalidReading(String),
}

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;
