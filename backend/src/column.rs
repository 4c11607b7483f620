//! Spreadsheet-style column references.
//!
//! Column letters are a bijective base-26 numeral: `A`=1 … `Z`=26, `AA`=27.
//! The resolved index is zero-based, so `A` → 0 and `AA` → 26.

use crate::error::{ColumnError, ColumnResult};

/// A validated column reference such as `B` or `ab`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef(String);

impl ColumnRef {
    /// Validate a user-supplied column letter.
    ///
    /// Surrounding whitespace is ignored. Anything else that is not an ASCII
    /// letter is rejected.
    pub fn parse(input: &str) -> ColumnResult<Self> {
        let letters = input.trim();
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ColumnError::InvalidColumnReference(input.to_string()));
        }
        Ok(Self(letters.to_ascii_uppercase()))
    }

    /// Zero-based index of this column, or `None` if it overflows `usize`.
    pub fn index(&self) -> Option<usize> {
        let mut sum: usize = 0;
        for b in self.0.bytes() {
            let digit = (b - b'A' + 1) as usize;
            sum = sum.checked_mul(26)?.checked_add(digit)?;
        }
        Some(sum - 1)
    }

    /// Resolve against a dataset with `column_count` columns.
    pub fn resolve_in(&self, column_count: usize) -> ColumnResult<usize> {
        match self.index() {
            Some(index) if index < column_count => Ok(index),
            index => Err(ColumnError::ColumnOutOfRange {
                letter: self.0.clone(),
                index: index.unwrap_or(usize::MAX),
                column_count,
            }),
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ColumnRef {
    type Err = ColumnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Validate `letters` and convert them to a zero-based index.
///
/// No dataset is involved, so the only range check is that the index fits
/// in `usize`.
pub fn resolve(letters: &str) -> ColumnResult<usize> {
    let column = ColumnRef::parse(letters)?;
    column
        .index()
        .ok_or(ColumnError::ColumnTooLarge { letter: column.0 })
}

/// Letters for a zero-based column index (0 → `A`, 26 → `AA`).
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_letters() {
        assert_eq!(resolve("A").unwrap(), 0);
        assert_eq!(resolve("B").unwrap(), 1);
        assert_eq!(resolve("Z").unwrap(), 25);
    }

    #[test]
    fn test_double_letters() {
        assert_eq!(resolve("AA").unwrap(), 26);
        assert_eq!(resolve("AB").unwrap(), 27);
        assert_eq!(resolve("AZ").unwrap(), 51);
        assert_eq!(resolve("BA").unwrap(), 52);
        assert_eq!(resolve("ZZ").unwrap(), 701);
        assert_eq!(resolve("AAA").unwrap(), 702);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(resolve("ab").unwrap(), resolve("AB").unwrap());
        assert_eq!(resolve("c").unwrap(), 2);
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert_eq!(resolve("  C ").unwrap(), 2);
    }

    #[test]
    fn test_invalid_references() {
        for bad in ["", "   ", "1", "A1", "A-B", "É"] {
            assert!(
                matches!(resolve(bad), Err(ColumnError::InvalidColumnReference(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_out_of_range() {
        let column = ColumnRef::parse("C").unwrap();
        assert_eq!(column.resolve_in(3).unwrap(), 2);

        let err = column.resolve_in(2).unwrap_err();
        assert_eq!(
            err,
            ColumnError::ColumnOutOfRange {
                letter: "C".into(),
                index: 2,
                column_count: 2,
            }
        );
    }

    #[test]
    fn test_overflow_is_out_of_range() {
        let column = ColumnRef::parse(&"Z".repeat(40)).unwrap();
        assert!(column.index().is_none());
        assert!(matches!(
            column.resolve_in(10),
            Err(ColumnError::ColumnOutOfRange { .. })
        ));
    }

    #[test]
    fn test_resolve_overflow_is_too_large() {
        let letters = "Z".repeat(40);
        let err = resolve(&letters).unwrap_err();

        assert_eq!(err, ColumnError::ColumnTooLarge { letter: letters.clone() });
        assert!(!err.to_string().contains("0 column(s)"));
    }

    #[test]
    fn test_column_letter_inverse() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(701), "ZZ");
        for i in [0, 5, 26, 51, 52, 700, 702, 18277] {
            assert_eq!(resolve(&column_letter(i)).unwrap(), i);
        }
    }
}
