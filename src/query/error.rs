//! Query error types

use thiserror::Error;

/// Errors that can occur while interpreting query parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// A grouping directive of a type that cannot be coerced
    #[error("Invalid grouping: {0}")]
    InvalidGrouping(String),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
