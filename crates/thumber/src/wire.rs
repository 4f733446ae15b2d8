use serde_json::Value;

use crate::error::ThumberError;

/// Flat key→value mapping in wire (underscore) form.
pub type WireMap = serde_json::Map<String, Value>;

/// Translates an internal (camel-case) field name to wire form.
///
/// An underscore is inserted at every lowercase→uppercase boundary and
/// the whole name is lowercased: `mimeType` → `mime_type`.
pub fn wire_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if prev_lower && c.is_ascii_uppercase() {
            out.push('_');
        }
        prev_lower = c.is_ascii_lowercase();
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Translates a wire (underscore) field name back to internal form.
///
/// Every underscore followed by a lowercase letter is removed and the
/// letter uppercased: `mime_type` → `mimeType`. Exact inverse of
/// [`wire_name`] for names made of ASCII letters and digits.
pub fn internal_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '_'
            && let Some(&next) = chars.peek()
            && next.is_ascii_lowercase()
        {
            out.push(next.to_ascii_uppercase());
            chars.next();
            continue;
        }
        out.push(c);
    }
    out
}

/// Parses wire bytes into a flat map.
///
/// Anything other than a JSON object is a malformed payload.
pub fn parse(body: &[u8]) -> Result<WireMap, ThumberError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ThumberError::MalformedPayload(format!("invalid JSON: {e}")))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ThumberError::MalformedPayload(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_name_splits_case_boundaries() {
        assert_eq!(wire_name("mimeType"), "mime_type");
        assert_eq!(wire_name("decodedData"), "decoded_data");
        assert_eq!(wire_name("nonce"), "nonce");
    }

    #[test]
    fn internal_name_joins_underscores() {
        assert_eq!(internal_name("mime_type"), "mimeType");
        assert_eq!(internal_name("decoded_data"), "decodedData");
        assert_eq!(internal_name("timestamp"), "timestamp");
    }

    #[test]
    fn codec_is_inverse_for_model_fields() {
        let fields = [
            "nonce", "timestamp", "checksum", "data", "uid", "callback", "url", "mimeType",
            "geometry", "pg", "success", "error",
        ];
        for field in fields {
            assert_eq!(internal_name(&wire_name(field)), field, "field {field}");
        }
    }

    #[test]
    fn digits_survive_the_round_trip() {
        assert_eq!(wire_name("sha256Digest"), "sha256_digest");
        assert_eq!(internal_name("sha256_digest"), "sha256Digest");
    }

    #[test]
    fn parse_rejects_invalid_json() {
        let err = parse(b"{not json").unwrap_err();
        assert!(matches!(err, ThumberError::MalformedPayload(_)));
    }

    #[test]
    fn parse_rejects_non_object() {
        let err = parse(b"[1,2,3]").unwrap_err();
        assert!(matches!(err, ThumberError::MalformedPayload(_)));
    }

    #[test]
    fn parse_accepts_flat_object() {
        let map = parse(br#"{"nonce":"abc","timestamp":1000}"#).unwrap();
        assert_eq!(map.get("nonce").unwrap(), "abc");
        assert_eq!(map.get("timestamp").unwrap(), 1000);
    }
}
