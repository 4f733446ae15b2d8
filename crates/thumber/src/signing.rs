use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use md5::Md5;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::transaction::Transaction;

/// Only the first 1024 characters of each value enter the canonical
/// form. Both endpoints must truncate identically or signatures over
/// large payload fields diverge.
const VALUE_TRUNCATION: usize = 1024;

/// RFC 3986 query escaping: the unreserved set passes through, space
/// becomes `%20`, everything else is percent-escaped.
const RFC3986_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

type HmacSha256 = Hmac<Sha256>;

/// Deterministic byte string over which transactions are signed.
///
/// Serialize, drop the checksum itself, stringify and truncate each
/// value, sort by wire name (plain byte order), percent-encode and join
/// as a query string. Two independent implementations given the same
/// field values must produce this string byte for byte.
pub fn canonical_form<T: Transaction>(transaction: &T) -> String {
    let mut map = transaction.serialize();
    map.remove("checksum");

    let mut entries: Vec<(String, String)> = map
        .into_iter()
        .map(|(key, value)| (key, truncate_chars(value_text(&value))))
        .collect();
    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    let pairs: Vec<String> = entries
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, RFC3986_ESCAPE),
                utf8_percent_encode(value, RFC3986_ESCAPE)
            )
        })
        .collect();
    pairs.join("&")
}

/// Textual representation of a wire value, before truncation.
///
/// Matches the remote endpoint's string casts: `true` is `"1"`,
/// `false` is the empty string, numbers print in decimal.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        other => other.to_string(),
    }
}

fn truncate_chars(text: String) -> String {
    if text.len() <= VALUE_TRUNCATION {
        return text;
    }
    text.chars().take(VALUE_TRUNCATION).collect()
}

/// HMAC-SHA256 over the canonical form. Raw 32-byte digest.
pub fn compute_checksum<T: Transaction>(transaction: &T, secret: &str) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(canonical_form(transaction).as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Whether the stored checksum matches a fresh computation under
/// `secret`. Constant-time comparison; absent checksum never verifies.
pub fn verify<T: Transaction>(transaction: &T, secret: &str) -> bool {
    let Some(stored) = transaction.envelope().checksum.as_deref() else {
        return false;
    };
    let computed = compute_checksum(transaction, secret);
    bool::from(stored.ct_eq(&computed))
}

/// Fresh correlation nonce: MD5 of the wall clock at nanosecond
/// precision, as 32 hex characters. A correlation token only — the
/// checksum is the sole integrity guarantee.
pub fn generate_nonce() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let instant = format!("{}.{:09}", now.as_secs(), now.subsec_nanos());
    hex::encode(Md5::digest(instant.as_bytes()))
}
