//! Canonical form — deterministic serialization and semantic hashing
//!
//! # Pipeline
//!
//! `LicenseDocument → serde_json::Value → canonical text (sorted keys, no whitespace) → SHA-256`
//!
//! # Guarantees
//!
//! - **Deterministic**: same document always produces the same text and hash
//! - **Order-free keys**: object key order in the input JSON does not matter
//! - **Terms only**: the semantic hash covers what the parties agree to
//!   (name, parties, current terms), not timestamps, status or history

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{Error, LicenseDocument, Result};

// ── Public API ─────────────────────────────────────────────

/// Canonical compact JSON for any serializable value
pub fn to_canonical<T: serde::Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    let mut out = String::new();
    write_value(&mut out, &value);
    Ok(out)
}

/// SHA-256 over the agreed terms of the current version
///
/// Two documents with the same license id, name, parties and current-version
/// data hash the same, regardless of status or how many versions led there.
pub fn semantic_hash(doc: &LicenseDocument) -> Result<String> {
    let current = doc.current().ok_or_else(|| {
        Error::DocumentError(format!(
            "current version {} not found",
            doc.current_version
        ))
    })?;
    let terms = serde_json::json!({
        "licenseId": doc.license_id,
        "name": doc.name,
        "parties": doc.parties,
        "data": current.data,
    });
    Ok(sha256_hex(&to_canonical(&terms)?))
}

/// SHA-256 over the whole document, history included
pub fn document_hash(doc: &LicenseDocument) -> Result<String> {
    Ok(sha256_hex(&to_canonical(doc)?))
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

// ── Writer ─────────────────────────────────────────────────

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, &map[key]);
            }
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}
