//! CSV output for flattened tables.
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! failed run never leaves a partial output file behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{CsvError, CsvResult};
use crate::transform::schema::OutputTable;

/// Write `table` as UTF-8 CSV: one header row, then one line per row.
/// An empty schema produces no output at all.
pub fn write_table<W: Write>(table: &OutputTable, writer: W) -> CsvResult<()> {
    if table.schema.is_empty() {
        return Ok(());
    }

    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv_writer.write_record(&table.schema)?;
    for row in &table.rows {
        csv_writer.write_record(row)?;
    }

    csv_writer
        .flush()
        .map_err(|e| CsvError::WriteError(e.to_string()))
}

/// Serialize `table` to CSV bytes.
pub fn table_to_bytes(table: &OutputTable) -> CsvResult<Vec<u8>> {
    let mut buf = Vec::new();
    write_table(table, &mut buf)?;
    Ok(buf)
}

/// Write `table` to `path`, replacing any existing file only on success.
pub fn write_table_file(table: &OutputTable, path: &Path) -> CsvResult<()> {
    let bytes = table_to_bytes(table)?;
    let tmp = temp_path(path);

    if let Err(e) = fs::write(&tmp, &bytes).and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(CsvError::IoError(e));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output.csv".into());
    name.push(".partial");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> OutputTable {
        OutputTable {
            schema: vec!["a".into(), "itemSku".into(), "note".into()],
            rows: vec![
                vec!["1".into(), "SKU1;SKU2".into(), "".into()],
                vec!["".into(), "".into(), "hello, world".into()],
            ],
        }
    }

    #[test]
    fn test_write_table() {
        let bytes = table_to_bytes(&table()).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(text, "a,itemSku,note\n1,SKU1;SKU2,\n,,\"hello, world\"\n");
    }

    #[test]
    fn test_empty_schema_writes_nothing() {
        let bytes = table_to_bytes(&OutputTable::default()).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_write_file_leaves_no_temporary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parsed_output.csv");

        write_table_file(&table(), &path).unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("parsed_output.csv.partial").exists());
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("a,itemSku,note\n"));
    }

    #[test]
    fn test_write_file_into_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");

        let err = write_table_file(&table(), &path).unwrap_err();

        assert!(matches!(err, CsvError::IoError(_)));
        assert!(!path.exists());
    }
}
