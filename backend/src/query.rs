//! URL query-string decoding.
//!
//! `a=1&B=two+words&flag` decodes to `{a: "1", b: "two words", flag: ""}`.
//! Keys are lower-cased and the first occurrence of a key wins.

use indexmap::IndexMap;
use percent_encoding::percent_decode_str;

/// Decoded query string: lower-cased key → value, in first-seen order.
pub type FieldMap = IndexMap<String, String>;

/// Decode an `application/x-www-form-urlencoded` string.
///
/// Never fails. Empty segments are skipped, a segment without `=` is a key
/// with an empty value, malformed `%` escapes are kept as-is and invalid
/// UTF-8 is replaced.
pub fn decode(raw: &str) -> FieldMap {
    let mut fields = FieldMap::new();

    for segment in raw.split('&') {
        if segment.is_empty() {
            continue;
        }

        let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
        let key = decode_component(key).to_lowercase();

        fields
            .entry(key)
            .or_insert_with(|| decode_component(value));
    }

    fields
}

/// Decode one key or value: `+` is a space, then `%XX` escapes.
fn decode_component(component: &str) -> String {
    let spaced = component.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(fields: &FieldMap) -> Vec<(&str, &str)> {
        fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    #[test]
    fn test_simple_pairs() {
        let fields = decode("a=1&b=2");
        assert_eq!(pairs(&fields), vec![("a", "1"), ("b", "2")]);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let fields = decode("a=1&a=2");
        assert_eq!(pairs(&fields), vec![("a", "1")]);
    }

    #[test]
    fn test_first_wins_after_case_folding() {
        let fields = decode("Order=1&ORDER=2&order=3");
        assert_eq!(pairs(&fields), vec![("order", "1")]);
    }

    #[test]
    fn test_empty_input() {
        assert!(decode("").is_empty());
        assert!(decode("&&").is_empty());
    }

    #[test]
    fn test_key_without_value() {
        let fields = decode("x");
        assert_eq!(pairs(&fields), vec![("x", "")]);

        let fields = decode("x=&y");
        assert_eq!(pairs(&fields), vec![("x", ""), ("y", "")]);
    }

    #[test]
    fn test_keys_lowercased() {
        let fields = decode("ItemSku=ABC&CURRENCY=EUR");
        assert_eq!(fields.get("itemsku").map(String::as_str), Some("ABC"));
        assert_eq!(fields.get("currency").map(String::as_str), Some("EUR"));
    }

    #[test]
    fn test_percent_and_plus_decoding() {
        let fields = decode("name=Jane+Doe&email=jane%40example.com&note=a%2Bb&city=S%C3%A3o+Paulo");
        assert_eq!(fields["name"], "Jane Doe");
        assert_eq!(fields["email"], "jane@example.com");
        assert_eq!(fields["note"], "a+b");
        assert_eq!(fields["city"], "São Paulo");
    }

    #[test]
    fn test_value_keeps_extra_equals() {
        let fields = decode("token=abc==&x=1");
        assert_eq!(fields["token"], "abc==");
    }

    #[test]
    fn test_malformed_escape_kept() {
        let fields = decode("a=100%zz&b=%");
        assert_eq!(fields["a"], "100%zz");
        assert_eq!(fields["b"], "%");
    }

    #[test]
    fn test_invalid_utf8_replaced() {
        let fields = decode("a=%FF");
        assert_eq!(fields["a"], "\u{FFFD}");
    }

    #[test]
    fn test_missing_cell_marker_decodes_to_key() {
        let fields = decode("nan");
        assert_eq!(pairs(&fields), vec![("nan", "")]);
    }
}
