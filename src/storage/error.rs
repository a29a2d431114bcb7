//! Storage error types
//!
//! Defines all errors that can occur in the reading store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in a reading or channel store
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create the directory holding the database file
    #[error("Failed to create database directory {path:?}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Lock acquisition failed (poisoned mutex)
    #[error("Lock error: {0}")]
    Lock(String),
}

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        StorageError::Lock(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::Lock("poisoned".to_string());
        assert_eq!(err.to_string(), "Lock error: poisoned");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let storage_err: StorageError = io_err.into();
        assert!(matches!(storage_err, StorageError::Io(_)));
    }

    #[test]
    fn test_sqlite_error_conversion() {
        let err: StorageError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StorageError::Database(_)));
    }
}
