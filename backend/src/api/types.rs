//! REST API types.
//!
//! `POST /api/parse` answers with CSV by default; these types cover the JSON
//! form (`format=json`) and error bodies.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::transform::pipeline::{format_delimiter, PipelineOutput, SkippedRow};

/// Requested response body for `POST /api/parse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Csv,
    Json,
}

impl ResponseFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "csv" => Some(ResponseFormat::Csv),
            "json" => Some(ResponseFormat::Json),
            _ => None,
        }
    }
}

/// JSON response for a successful parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResponse {
    /// "ready" when every row was flattened, "warning" when some were skipped
    pub status: String,
    /// Output column names in order
    pub schema: Vec<String>,
    /// Output rows, cells in schema order
    pub rows: Vec<Vec<String>>,
    pub metadata: ResponseMetadata,
}

/// Metadata about the run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// Resolved column letter
    pub column: String,
    pub rows_written: usize,
    pub rows_skipped: usize,
    pub skipped: Vec<SkippedRowInfo>,
    pub csv_info: CsvMetadata,
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

/// A row left out of the output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRowInfo {
    pub row: usize,
    pub reason: String,
}

impl From<&SkippedRow> for SkippedRowInfo {
    fn from(skip: &SkippedRow) -> Self {
        Self {
            row: skip.row,
            reason: skip.reason.clone(),
        }
    }
}

impl From<PipelineOutput> for ParseResponse {
    fn from(output: PipelineOutput) -> Self {
        let rows_skipped = output.skipped.len();

        ParseResponse {
            status: if rows_skipped == 0 { "ready" } else { "warning" }.to_string(),
            metadata: ResponseMetadata {
                column: output.column.to_string(),
                rows_written: output.table.len(),
                rows_skipped,
                skipped: output.skipped.iter().map(SkippedRowInfo::from).collect(),
                csv_info: CsvMetadata {
                    encoding: output.csv_info.encoding,
                    delimiter: format_delimiter(output.csv_info.delimiter),
                    row_count: output.csv_info.row_count,
                    columns: output.csv_info.headers,
                },
            },
            schema: output.table.schema,
            rows: output.table.rows,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
        "schema": [],
        "rows": []
    })
}
