//! Canonical JSON serialization.
//!
//! Object keys are sorted recursively and the output carries no
//! insignificant whitespace. The string produced here is the exact byte
//! sequence a submitter signs.
//!
//! Key order matches what a JS engine emits for a key-sorted object: keys
//! that are array indices come first in numeric order, then every other key
//! in UTF-16 code unit order. Numbers are written by serde_json. Integers
//! match JS output. Floats use the shortest round-trip digits in both, but
//! serde_json switches to exponent notation at other magnitudes and omits the
//! `+` sign (`1e21` where JS writes `1e+21`), so a payload with very large or
//! very small floats may canonicalize differently than in a browser.
//! Verification checks the exact signed string and never re-canonicalizes.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;

/// Serialize `value` canonically.
pub fn to_canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

/// Convert any serializable payload to a `Value` and serialize it canonically.
pub fn canonical_json_of<T: Serialize>(payload: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(payload)?;
    Ok(to_canonical_json(&value))
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(item, out);
            }
            out.push('}');
        }
        // Scalars: serde_json's compact Display
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Largest array index a JS engine treats as an integer key.
const MAX_ARRAY_INDEX: u64 = u32::MAX as u64 - 1;

fn array_index(key: &str) -> Option<u64> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u64>().ok().filter(|&n| n <= MAX_ARRAY_INDEX)
}

fn compare_keys(a: &str, b: &str) -> Ordering {
    match (array_index(a), array_index(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.encode_utf16().cmp(b.encode_utf16()),
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push_str(&Value::String(s.to_owned()).to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sorts_nested_keys() {
        let value = json!({
            "form": { "ssn": "123-45-6789", "name": "Jane", "address": { "zip": "02139", "city": "Cambridge" } },
            "account": "0xabc"
        });
        assert_eq!(
            to_canonical_json(&value),
            r#"{"account":"0xabc","form":{"address":{"city":"Cambridge","zip":"02139"},"name":"Jane","ssn":"123-45-6789"}}"#
        );
    }

    #[test]
    fn test_arrays_keep_order() {
        let value = json!({ "b": [3, 1, { "z": 1, "a": 2 }], "a": null });
        assert_eq!(to_canonical_json(&value), r#"{"a":null,"b":[3,1,{"a":2,"z":1}]}"#);
    }

    #[test]
    fn test_key_order_is_utf16() {
        // U+FF61 sorts after U+1F600 in UTF-8 but before it in UTF-16.
        let value = json!({ "\u{1F600}": 1, "\u{FF61}": 2 });
        assert_eq!(to_canonical_json(&value), "{\"\u{FF61}\":2,\"\u{1F600}\":1}");
    }

    #[test]
    fn test_integer_keys_come_first_in_numeric_order() {
        let value = json!({ "b": 1, "10": 2, "2": 3, "a": 4, "02": 5, "-1": 6, "4294967295": 7 });
        assert_eq!(
            to_canonical_json(&value),
            r#"{"2":3,"10":2,"-1":6,"02":5,"4294967295":7,"a":4,"b":1}"#
        );
    }

    #[test]
    fn test_array_index_bounds() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("4294967294"), Some(4_294_967_294));
        assert_eq!(array_index("4294967295"), None);
        assert_eq!(array_index("007"), None);
        assert_eq!(array_index("+1"), None);
        assert_eq!(array_index(""), None);
    }

    #[test]
    fn test_strings_are_escaped() {
        let value = json!({ "quote\"key": "line\nbreak" });
        assert_eq!(to_canonical_json(&value), r#"{"quote\"key":"line\nbreak"}"#);
    }

    #[test]
    fn test_equal_payloads_serialize_identically() {
        let a: Value = serde_json::from_str(r#"{"x":1,"y":{"b":true,"a":false}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{ "y": { "a": false, "b": true }, "x": 1 }"#).unwrap();
        assert_eq!(to_canonical_json(&a), to_canonical_json(&b));
    }

    #[test]
    fn test_canonical_json_of_struct() {
        #[derive(Serialize)]
        struct Form {
            zeta: u8,
            alpha: &'static str,
        }
        assert_eq!(
            canonical_json_of(&Form { zeta: 1, alpha: "x" }).unwrap(),
            r#"{"alpha":"x","zeta":1}"#
        );
    }
}
