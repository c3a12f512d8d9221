//! Storage Error Types

use std::io;
use thiserror::Error;

use crate::value::SchemaViolation;

/// Errors from data loading and workspace serialization
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed row or value
    #[error("row {row}: {message}")]
    Parse { row: usize, message: String },

    /// File extension with no loader
    #[error("unsupported file format '{0}'; expected csv, tsv, or json")]
    UnsupportedFormat(String),

    /// The data model has no nulls; absent values must be decomposed
    /// into separate relations before loading
    #[error("empty field in row {row}, column '{column}'; decompose absent fields into a separate relation instead")]
    EmptyField { row: usize, column: String },

    /// Header naming the same column twice
    #[error("duplicate column name '{0}' in header")]
    DuplicateColumn(String),

    /// File with no header row
    #[error("file has no header row")]
    MissingHeader,

    /// Tuple that does not conform to its relation schema
    #[error(transparent)]
    Schema(#[from] SchemaViolation),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
