//! Deterministic serialization and hashing of schema representations.

use std::collections::HashSet;
use std::fmt::Write;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Rendered in place of a node that is already being serialized.
pub const CIRCULAR_PLACEHOLDER: &str = "\"[Circular]\"";

/// Serialize `value` with object keys sorted and no insignificant whitespace.
pub fn canonical_string(value: &Value) -> String {
    let mut out = String::new();
    let mut active = HashSet::new();
    write_value(&mut out, value, &mut active);
    out
}

/// Hex-encoded SHA-256 of the canonical form.
pub fn content_hash(value: &Value) -> String {
    let digest = Sha256::digest(canonical_string(value).as_bytes());
    hex::encode(digest)
}

fn write_value(out: &mut String, value: &Value, active: &mut HashSet<*const Value>) {
    let id = std::ptr::from_ref(value);
    match value {
        Value::Array(items) => {
            if !active.insert(id) {
                out.push_str(CIRCULAR_PLACEHOLDER);
                return;
            }
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item, active);
            }
            out.push(']');
            active.remove(&id);
        }
        Value::Object(map) => {
            if !active.insert(id) {
                out.push_str(CIRCULAR_PLACEHOLDER);
                return;
            }
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, &map[key], active);
            }
            out.push('}');
            active.remove(&id);
        }
        Value::String(s) => write_string(out, s),
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Null => out.push_str("null"),
    }
}

fn write_string(out: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => {
            let _ = write!(out, "{s:?}");
        }
    }
}
