//! High-level pipeline: CSV in, flattened table out.
//!
//! 1. Validate the column letter (before touching the data)
//! 2. Parse the CSV with encoding/delimiter auto-detection
//! 3. Resolve the column against the header row
//! 4. Flatten every row, collecting one [`RowOutcome`] per row
//! 5. Union the columns of the successful rows into an [`OutputTable`]
//!
//! # Example
//!
//! ```rust,ignore
//! use qsflat::{transform_csv, ParseOptions};
//! use std::path::Path;
//!
//! let options = ParseOptions::new("C").separate_items(true);
//! let output = transform_csv(Path::new("orders.csv"), &options)?;
//! println!("{} rows, {} skipped", output.table.len(), output.skipped.len());
//! ```

use serde::Serialize;
use std::path::Path;

use super::row::{ItemMode, OutputRecord, RowTransformer, DEFAULT_MAX_ITEM_INDEX};
use super::schema::OutputTable;
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning, log_warning_indent};
use crate::column::{column_letter, ColumnRef};
use crate::error::{PipelineResult, RowTransformError};
use crate::parser::{parse_bytes, parse_csv_file, Cell, Dataset};

/// How many skipped rows are listed individually in the log.
const MAX_LOGGED_SKIPS: usize = 10;

/// Options for one run of the pipeline
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Column letter holding the query strings
    pub column: String,
    /// Item mode (`itemSku`… columns or a single `items` column)
    pub mode: ItemMode,
    /// CSV delimiter; auto-detected when `None`
    pub delimiter: Option<char>,
    /// Item index ceiling per row
    pub max_item_index: usize,
}

impl ParseOptions {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            mode: ItemMode::default(),
            delimiter: None,
            max_item_index: DEFAULT_MAX_ITEM_INDEX,
        }
    }

    pub fn separate_items(mut self, separate: bool) -> Self {
        self.mode = ItemMode::from_separate(separate);
        self
    }

    pub fn with_delimiter(mut self, delimiter: Option<char>) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_max_item_index(mut self, max_item_index: usize) -> Self {
        self.max_item_index = max_item_index;
        self
    }
}

/// Result of flattening one input row.
#[derive(Debug, Clone)]
pub enum RowOutcome {
    Transformed(OutputRecord),
    Skipped(SkippedRow),
}

/// A row left out of the output, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// 1-based data row number (the header is not counted)
    pub row: usize,
    pub reason: String,
    #[serde(skip)]
    pub error: RowTransformError,
}

/// CSV file information
#[derive(Debug, Clone, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Result of a complete pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// The flattened table
    pub table: OutputTable,
    /// Rows that could not be flattened
    pub skipped: Vec<SkippedRow>,
    /// Resolved column letter and zero-based index
    pub column: ColumnRef,
    pub column_index: usize,
    pub csv_info: CsvInfo,
}

/// Flatten the query-string column of a CSV file.
pub fn transform_csv(path: &Path, options: &ParseOptions) -> PipelineResult<PipelineOutput> {
    let column = ColumnRef::parse(&options.column)?;

    log_info(format!("📖 Reading {}...", path.display()));
    let dataset = parse_csv_file(path, options.delimiter)?;
    transform_dataset(&dataset, &column, options)
}

/// Same as [`transform_csv`] for CSV content already in memory.
pub fn transform_bytes(bytes: &[u8], options: &ParseOptions) -> PipelineResult<PipelineOutput> {
    let column = ColumnRef::parse(&options.column)?;

    log_info(format!("📖 Reading {} bytes of CSV...", bytes.len()));
    let dataset = parse_bytes(bytes, options.delimiter)?;
    transform_dataset(&dataset, &column, options)
}

/// Flatten an already-parsed dataset.
pub fn transform_dataset(
    dataset: &Dataset,
    column: &ColumnRef,
    options: &ParseOptions,
) -> PipelineResult<PipelineOutput> {
    log_success(format!("Detected encoding: {}", dataset.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(dataset.delimiter)));
    log_success(format!(
        "Read {} rows, {} columns",
        dataset.rows.len(),
        dataset.column_count()
    ));

    let column_index = column.resolve_in(dataset.column_count())?;
    log_info(format!(
        "🔎 Query strings in column {} ({})",
        column,
        dataset.headers[column_index]
    ));

    let transformer = RowTransformer::new(column_index, options.mode)
        .with_max_item_index(options.max_item_index);

    log_info(format!("⚙️  Flattening rows ({:?} items)...", options.mode));
    let outcomes = transform_rows(&dataset.rows, &transformer);
    let (records, skipped) = partition_outcomes(outcomes);
    report_skipped(&skipped);

    let table = OutputTable::from_records(&records);
    log_success(format!(
        "{} rows flattened into {} columns",
        table.len(),
        table.schema.len()
    ));

    Ok(PipelineOutput {
        table,
        skipped,
        column: column.clone(),
        column_index,
        csv_info: CsvInfo {
            encoding: dataset.encoding.clone(),
            delimiter: dataset.delimiter,
            headers: dataset.headers.clone(),
            row_count: dataset.rows.len(),
        },
    })
}

/// Flatten every row in input order. One bad row never stops the others.
pub fn transform_rows(rows: &[Vec<Cell>], transformer: &RowTransformer) -> Vec<RowOutcome> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| match transformer.transform(row) {
            Ok(record) => RowOutcome::Transformed(record),
            Err(error) => RowOutcome::Skipped(SkippedRow {
                row: i + 1,
                reason: error.to_string(),
                error,
            }),
        })
        .collect()
}

/// Split outcomes into records (input order kept) and skipped rows.
pub fn partition_outcomes(outcomes: Vec<RowOutcome>) -> (Vec<OutputRecord>, Vec<SkippedRow>) {
    let mut records = Vec::with_capacity(outcomes.len());
    let mut skipped = Vec::new();

    for outcome in outcomes {
        match outcome {
            RowOutcome::Transformed(record) => records.push(record),
            RowOutcome::Skipped(skip) => skipped.push(skip),
        }
    }

    (records, skipped)
}

fn report_skipped(skipped: &[SkippedRow]) {
    if skipped.is_empty() {
        return;
    }

    log_warning(format!("{} row(s) skipped", skipped.len()));
    for skip in skipped.iter().take(MAX_LOGGED_SKIPS) {
        log_warning_indent(format!("Row {}: {}", skip.row, skip.reason), 1);
    }
    if skipped.len() > MAX_LOGGED_SKIPS {
        log_info_indent(format!("... +{} more", skipped.len() - MAX_LOGGED_SKIPS), 1);
    }
}

/// `[A] order_id`, `[B] query` … for every header column.
pub fn describe_columns(headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("[{}] {}", column_letter(i), h))
        .collect()
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}
