//! Index key ordering through the public API.

use std::cmp::Ordering;

use dbf_core::{DbfError, KeyCompare, KeyValue, NTX_MAX_KEY_LENGTH};

/// Keys taken from fixed-width record fields keep their field order.
#[test]
fn test_field_keys_sort_like_records() {
    let names = ["SMITH     ", "ADAMS     ", "MILLER    ", "ADAMSON   "];
    let mut keys: Vec<KeyValue> = names
        .iter()
        .map(|n| KeyValue::from_bytes(n.as_bytes()))
        .collect();
    keys.sort_by(|a, b| KeyCompare.compare(a, b).unwrap());

    let sorted: Vec<String> = keys
        .iter()
        .map(|k| String::from_utf8_lossy(k.as_bytes()).trim_end().to_string())
        .collect();
    assert_eq!(sorted, vec!["ADAMS", "ADAMSON", "MILLER", "SMITH"]);
}

#[test]
fn test_mixed_lengths_never_compare() {
    let short = KeyValue::from_bytes(b"ADAMS");
    let long = KeyValue::from_bytes(b"ADAMS     ");
    assert!(matches!(
        KeyCompare.less(&short, &long),
        Err(DbfError::LengthMismatch { left: 5, right: 10 })
    ));
    assert!(short.partial_cmp(&long).is_none());

    let normalized = KeyValue::new(Some(b"ADAMS     ".as_slice()), 5);
    assert_eq!(short.compare(&normalized).unwrap(), Ordering::Equal);
}

#[test]
fn test_maximum_length_key() {
    let big = vec![0xFFu8; NTX_MAX_KEY_LENGTH + 10];
    let key = KeyValue::from_bytes(&big);
    assert_eq!(key.len(), NTX_MAX_KEY_LENGTH);
    assert!(key.as_bytes().iter().all(|&b| b == 0xFF));
}
