//! # qsflat - flatten query strings stored in a CSV column
//!
//! Order exports often carry a whole URL query string in one cell
//! (`item1=SKU1&amt1=10&qty1=2&currency=EUR`). qsflat decodes that column
//! and writes one CSV column per query field, regrouping the indexed line
//! item fields (`item<N>`, `amt<N>`, `qty<N>`, `dcnt<N>`).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│  Row × N    │────▶│ Schema union│──▶ CSV
//! │  (ISO/UTF8) │     │  (auto-enc) │     │  (flatten)  │     │  + reindex  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use qsflat::{transform_csv, write_table_file, ParseOptions};
//! use std::path::Path;
//!
//! let options = ParseOptions::new("C").separate_items(true);
//! let output = transform_csv(Path::new("orders.csv"), &options)?;
//! write_table_file(&output.table, Path::new("parsed_output.csv"))?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`column`] - Spreadsheet column letters
//! - [`query`] - Query-string decoding
//! - [`parser`] - CSV parsing with auto-detection
//! - [`transform`] - Row flattening, schema union, pipeline
//! - [`output`] - CSV output
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;

// Input
pub mod column;
pub mod parser;
pub mod query;

// Transformation
pub mod transform;

// Output
pub mod output;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{ColumnError, CsvError, PipelineError, RowTransformError, ServerError};

// =============================================================================
// Re-exports - Input
// =============================================================================

pub use column::{column_letter, resolve, ColumnRef};
pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes, parse_bytes_auto,
    parse_csv_file, parse_csv_file_auto, parse_str, Cell, Dataset,
};
pub use query::{decode, FieldMap};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::pipeline::{
    describe_columns, transform_bytes, transform_csv, transform_dataset, transform_rows,
    CsvInfo, ParseOptions, PipelineOutput, RowOutcome, SkippedRow,
};
pub use transform::row::{
    transform_row, ItemColumns, ItemMode, ItemPrefix, ItemRecord, OutputField, OutputRecord,
    RowTransformer,
};
pub use transform::schema::{union_schema, OutputTable};

// =============================================================================
// Re-exports - Output & config
// =============================================================================

pub use config::Config;
pub use output::{table_to_bytes, write_table, write_table_file};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
