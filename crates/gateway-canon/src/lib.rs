//! # gateway-canon
//!
//! Canonical JSON serialization for the agent interaction gateway.
//!
//! Every hash in the gateway — manifest hashes, interaction-record hashes,
//! action hashes bound into override tokens — is computed over a
//! byte-exact, deterministic rendering of a JSON value: object keys sorted
//! lexicographically at every depth, no insignificant whitespace, integral
//! floats rendered without a decimal point, and non-integral floats rounded
//! to 10 decimal places. Two semantically equal JSON documents that differ
//! only in key order or float formatting must canonicalize to the same
//! bytes.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors produced while canonicalizing a JSON value.
#[derive(Debug, Error)]
pub enum CanonError {
    /// A number could not be represented (e.g. NaN or an out-of-range float).
    #[error("value is not representable as canonical JSON: {0}")]
    NotRepresentable(String),
}

/// Render `value` as canonical JSON text.
///
/// Keys are sorted lexicographically at every object depth; arrays keep
/// their element order. The output carries no whitespace outside of string
/// literals.
pub fn canonicalize(value: &Value) -> Result<String, CanonError> {
    let mut out = String::new();
    write_value(&mut out, value)?;
    Ok(out)
}

/// SHA-256 of the canonical rendering of `value`, lowercase hex.
pub fn canonical_hash(value: &Value) -> Result<String, CanonError> {
    let canon = canonicalize(value)?;
    Ok(hex_sha256(canon.as_bytes()))
}

/// SHA-256 of arbitrary bytes, lowercase hex — the hash primitive every
/// other hash in this crate is built from.
pub fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn write_value(out: &mut String, value: &Value) -> Result<(), CanonError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(out, n)?,
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            // serde_json::Map may be a BTreeMap or an insertion-ordered
            // IndexMap depending on the `preserve_order` feature; sort
            // explicitly so canonicalization never depends on that choice.
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push('{');
            for (i, (k, v)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, k);
                out.push(':');
                write_value(out, v)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_number(out: &mut String, n: &serde_json::Number) -> Result<(), CanonError> {
    if let Some(i) = n.as_i64() {
        let _ = write!(out, "{}", i);
        return Ok(());
    }
    if let Some(u) = n.as_u64() {
        let _ = write!(out, "{}", u);
        return Ok(());
    }
    let f = n
        .as_f64()
        .ok_or_else(|| CanonError::NotRepresentable(n.to_string()))?;
    if !f.is_finite() {
        return Err(CanonError::NotRepresentable(n.to_string()));
    }
    if f == f.floor() && f.abs() < 1e18 {
        let _ = write!(out, "{}", f as i64);
    } else {
        let _ = write!(out, "{:.10}", f);
    }
    Ok(())
}

/// ASCII-safe string escaping matching `serde_json`'s own escape table —
/// control characters, quote, and backslash are escaped; everything else
/// (including non-ASCII UTF-8) passes through unchanged.
fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_object_keys_at_every_depth() {
        let value = json!({"b": 1, "a": {"z": 1, "y": 2}});
        let canon = canonicalize(&value).unwrap();
        assert_eq!(canon, r#"{"a":{"y":2,"z":1},"b":1}"#);
    }

    #[test]
    fn arrays_preserve_order() {
        let value = json!([3, 1, 2]);
        assert_eq!(canonicalize(&value).unwrap(), "[3,1,2]");
    }

    #[test]
    fn integral_floats_drop_decimal_point() {
        let value = json!(10.0);
        assert_eq!(canonicalize(&value).unwrap(), "10");
    }

    #[test]
    fn non_integral_floats_round_to_ten_places() {
        let value = json!(1.5);
        assert_eq!(canonicalize(&value).unwrap(), "1.5000000000");
    }

    #[test]
    fn no_whitespace_in_output() {
        let value = json!({"a": [1, 2], "b": "x"});
        let canon = canonicalize(&value).unwrap();
        assert!(!canon.contains(' '));
        assert!(!canon.contains('\n'));
    }

    #[test]
    fn string_escaping_matches_json_rules() {
        let value = json!("line\nbreak\"quote");
        let canon = canonicalize(&value).unwrap();
        assert_eq!(canon, r#""line\nbreak\"quote""#);
    }

    #[test]
    fn canonical_is_idempotent() {
        let value = json!({"z": 1, "a": [1, {"d": 2, "c": 3}], "m": 2.0});
        let once = canonicalize(&value).unwrap();
        let reparsed: Value = serde_json::from_str(&once).unwrap();
        let twice = canonicalize(&reparsed).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn canonical_hash_is_deterministic() {
        let a = json!({"x": 1, "y": 2});
        let b = json!({"y": 2, "x": 1});
        assert_eq!(canonical_hash(&a).unwrap(), canonical_hash(&b).unwrap());
    }

    #[test]
    fn hex_sha256_matches_known_vector() {
        assert_eq!(
            hex_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
