//! Error types for the qsflat pipeline.
//!
//! - [`CsvError`] - reading, decoding and writing CSV files
//! - [`ColumnError`] - invalid or out-of-range column references
//! - [`RowTransformError`] - a single row could not be flattened (non-fatal)
//! - [`PipelineError`] - top-level errors that abort a run
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading or writing CSV data.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Content could not be decoded with the detected encoding.
    #[error("Failed to decode content as {encoding}: {message}")]
    EncodingError { encoding: String, message: String },

    /// Malformed CSV record.
    #[error("Invalid CSV at line {line}: {message}")]
    ParseError { line: u64, message: String },

    /// Failed to serialize the output table.
    #[error("Failed to write CSV: {0}")]
    WriteError(String),

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Io(io) => CsvError::IoError(io),
            kind => CsvError::ParseError {
                line,
                message: format!("{:?}", kind),
            },
        }
    }
}

// =============================================================================
// Column Errors
// =============================================================================

/// Errors resolving a spreadsheet-style column reference.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColumnError {
    /// Empty or non-alphabetic column letter.
    #[error("Invalid column reference '{0}': enter a column letter (e.g. A, B, AB)")]
    InvalidColumnReference(String),

    /// The column lies beyond the last column of the dataset.
    #[error("Column {letter} (index {index}) is out of range: the file has {column_count} column(s)")]
    ColumnOutOfRange {
        letter: String,
        index: usize,
        column_count: usize,
    },

    /// The column index does not fit in a machine word.
    #[error("Column {letter} is too far right to address")]
    ColumnTooLarge { letter: String },
}

// =============================================================================
// Row Errors
// =============================================================================

/// A failure confined to one input row. The row is skipped, the run goes on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowTransformError {
    /// The numeric suffix of an item key does not fit in an integer.
    #[error("Item index in '{key}' is not a valid number")]
    InvalidItemIndex { key: String },

    /// Item index above the configured ceiling.
    #[error("Item index {index} in '{key}' exceeds the limit of {max}")]
    ItemIndexTooLarge { key: String, index: usize, max: usize },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level errors. Any of these aborts the run and nothing is written.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Column reference error.
    #[error("{0}")]
    Column(#[from] ColumnError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for column resolution.
pub type ColumnResult<T> = Result<T, ColumnError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
