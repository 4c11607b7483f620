//! CSV reader with encoding and delimiter auto-detection.
//!
//! Produces a [`Dataset`]: the header row plus every data row as a vector of
//! [`Cell`]s. Cells are plain text; nothing is typed.

use std::borrow::Cow;
use std::path::Path;

use crate::error::{CsvError, CsvResult};

/// How an absent cell prints when it is used as text.
pub const MISSING_CELL: &str = "nan";

/// Field values read as an absent cell, as spreadsheet and dataframe
/// tooling does by default.
pub const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// One cell of the input table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// Any other text.
    Text(String),
    /// Empty or NA field, or a position past the end of a short row.
    Missing,
}

impl Cell {
    fn from_field(field: &str) -> Self {
        if NA_TOKENS.contains(&field) {
            Cell::Missing
        } else {
            Cell::Text(field.to_string())
        }
    }

    /// Textual form of the cell. `Missing` renders as [`MISSING_CELL`], the
    /// way spreadsheet exports print an absent value, so a blank query-string
    /// cell decodes to a single `nan` key.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Text(s) => Cow::Borrowed(s),
            Cell::Missing => Cow::Borrowed(MISSING_CELL),
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// A parsed CSV file.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Column headers
    pub headers: Vec<String>,
    /// Data rows, in file order
    pub rows: Vec<Vec<Cell>>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

impl Dataset {
    /// Number of columns, as given by the header row.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the given encoding.
///
/// UTF-8 input loses its BOM; unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let codec = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => encoding_rs::UTF_8,
        // WHATWG treats latin-1 labels as windows-1252, a superset.
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252
        }
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(codec) => codec,
            None => return Ok(String::from_utf8_lossy(bytes).into_owned()),
        },
    };

    let (content, _, had_errors) = codec.decode(bytes);
    if had_errors && codec != encoding_rs::UTF_8 {
        return Err(CsvError::EncodingError {
            encoding: encoding.to_string(),
            message: "content contains unmappable bytes".to_string(),
        });
    }
    Ok(content.into_owned())
}

/// Detect the delimiter by counting occurrences in the header line.
///
/// Falls back to `,` when the header holds a single column.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text with an explicit delimiter.
pub fn parse_str(content: &str, delimiter: char, encoding: impl Into<String>) -> CsvResult<Dataset> {
    let delimiter_byte = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| CsvError::ParseError {
            line: 0,
            message: format!("delimiter '{}' is not a single ASCII character", delimiter),
        })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() {
        return Err(if content.trim().is_empty() {
            CsvError::EmptyFile
        } else {
            CsvError::NoHeaders
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::from_field).collect());
    }

    Ok(Dataset {
        headers,
        rows,
        encoding: encoding.into(),
        delimiter,
    })
}

/// Parse CSV bytes. Encoding is always detected; the delimiter is detected
/// unless given.
pub fn parse_bytes(bytes: &[u8], delimiter: Option<char>) -> CsvResult<Dataset> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));

    parse_str(&content, delimiter, encoding)
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<Dataset> {
    parse_bytes(bytes, None)
}

/// Parse a CSV file, detecting the delimiter unless given.
pub fn parse_csv_file<P: AsRef<Path>>(path: P, delimiter: Option<char>) -> CsvResult<Dataset> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes, delimiter)
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<Dataset> {
    parse_csv_file(path, None)
}
