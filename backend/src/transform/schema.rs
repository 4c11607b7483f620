//! Union the columns of all flattened rows into one rectangular table.
//!
//! The column set is only known once every row has been transformed, so
//! records are buffered and reindexed in a single pass at the end.

use std::collections::HashSet;

use serde::Serialize;

use super::row::OutputRecord;

/// Flattened rows reindexed against a shared, sorted column set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputTable {
    /// Column names, sorted case-insensitively
    pub schema: Vec<String>,
    /// One row per record, cells in schema order; absent keys are empty
    pub rows: Vec<Vec<String>>,
}

impl OutputTable {
    /// Build the table from records in output order.
    pub fn from_records(records: &[OutputRecord]) -> Self {
        let schema = union_schema(records);

        let rows = records
            .iter()
            .map(|record| {
                schema
                    .iter()
                    .map(|column| record.get(column).unwrap_or("").to_string())
                    .collect()
            })
            .collect();

        Self { schema, rows }
    }

    /// Position of `column` in the schema.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.schema.iter().position(|c| c == column)
    }

    /// Cell at (`row`, `column`).
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|r| r[index].as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Every key of every record, once, sorted by lower-cased name with
/// byte-wise ordering as tie-break.
pub fn union_schema(records: &[OutputRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut schema: Vec<String> = records
        .iter()
        .flat_map(OutputRecord::keys)
        .filter(|key| seen.insert(key.clone()))
        .collect();

    schema.sort_by_cached_key(|key| (key.to_lowercase(), key.clone()));
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::row::{ItemMode, RowTransformer};

    fn records(queries: &[&str], mode: ItemMode) -> Vec<OutputRecord> {
        let transformer = RowTransformer::new(0, mode);
        queries
            .iter()
            .map(|q| transformer.transform_query(q).unwrap())
            .collect()
    }

    #[test]
    fn test_schema_union_and_reindex() {
        let mut recs = records(&["a=1&item1=X"], ItemMode::Separate);
        recs.extend(records(&["b=2"], ItemMode::Combined));

        let table = OutputTable::from_records(&recs);

        assert_eq!(
            table.schema,
            vec!["a", "b", "itemQuantity", "items", "itemSku", "itemUnitPrice"]
        );
        assert_eq!(table.get(0, "a"), Some("1"));
        assert_eq!(table.get(0, "b"), Some(""));
        assert_eq!(table.get(0, "itemSku"), Some("X"));
        assert_eq!(table.get(1, "a"), Some(""));
        assert_eq!(table.get(1, "b"), Some("2"));
        assert_eq!(table.get(1, "itemSku"), Some(""));
    }

    #[test]
    fn test_case_insensitive_sort() {
        let recs = records(&["zeta=1&Alpha=2&beta=3"], ItemMode::Combined);
        let table = OutputTable::from_records(&recs);

        assert_eq!(table.schema, vec!["alpha", "beta", "items", "zeta"]);
    }

    #[test]
    fn test_camel_case_columns_sort_among_lowercase() {
        let recs = records(&["jurisdiction=x&itemz=y&item1=A"], ItemMode::Separate);
        let table = OutputTable::from_records(&recs);

        assert_eq!(
            table.schema,
            vec!["itemQuantity", "itemSku", "itemUnitPrice", "itemz", "jurisdiction"]
        );
    }

    #[test]
    fn test_tie_break_is_byte_order() {
        let recs = records(&["itemsku=raw&item1=A"], ItemMode::Separate);
        let table = OutputTable::from_records(&recs);

        let sku = table.column_index("itemSku").unwrap();
        let raw = table.column_index("itemsku").unwrap();
        assert_eq!(raw, sku + 1);
    }

    #[test]
    fn test_discount_column_only_when_present() {
        let without = records(&["item1=A", "item1=B"], ItemMode::Separate);
        let table = OutputTable::from_records(&without);
        assert!(table.column_index("itemDiscount").is_none());

        let with = records(&["item1=A", "item1=B&dcnt1=5"], ItemMode::Separate);
        let table = OutputTable::from_records(&with);
        assert_eq!(table.get(0, "itemDiscount"), Some(""));
        assert_eq!(table.get(1, "itemDiscount"), Some("5"));
    }

    #[test]
    fn test_row_order_preserved() {
        let recs = records(&["n=1", "n=2", "n=3"], ItemMode::Combined);
        let table = OutputTable::from_records(&recs);

        let n: Vec<_> = (0..3).map(|i| table.get(i, "n").unwrap()).collect();
        assert_eq!(n, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_empty_table() {
        let table = OutputTable::from_records(&[]);
        assert!(table.schema.is_empty());
        assert!(table.is_empty());
    }
}
