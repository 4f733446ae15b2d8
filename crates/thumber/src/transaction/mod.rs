mod request;
mod response;

pub use request::ThumbnailRequest;
pub use response::ThumbnailResponse;

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

use crate::error::ThumberError;
use crate::wire::{self, WireMap};

/// Binary payload with two views: base64 text and raw bytes.
///
/// Exactly one representation is authoritative; the other is derived
/// lazily on first read and cached. Setting either side discards the
/// previous cache, so the views can never diverge.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    repr: Option<Repr>,
}

#[derive(Debug, Clone)]
enum Repr {
    Encoded {
        text: String,
        decoded: OnceLock<Vec<u8>>,
    },
    Decoded {
        bytes: Vec<u8>,
        encoded: OnceLock<String>,
    },
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        self.repr.is_none()
    }

    /// Makes the base64 text the authoritative representation.
    pub fn set_encoded(&mut self, text: String) {
        self.repr = Some(Repr::Encoded {
            text,
            decoded: OnceLock::new(),
        });
    }

    /// Makes the raw bytes the authoritative representation.
    pub fn set_decoded(&mut self, bytes: Vec<u8>) {
        self.repr = Some(Repr::Decoded {
            bytes,
            encoded: OnceLock::new(),
        });
    }

    pub fn clear(&mut self) {
        self.repr = None;
    }

    /// Base64 text view, derived from the raw bytes on first read.
    pub fn encoded(&self) -> Option<&str> {
        match &self.repr {
            None => None,
            Some(Repr::Encoded { text, .. }) => Some(text),
            Some(Repr::Decoded { bytes, encoded }) => {
                Some(encoded.get_or_init(|| BASE64.encode(bytes)))
            }
        }
    }

    /// Raw byte view, derived from the base64 text on first read.
    ///
    /// Fails with `MalformedPayload` when the authoritative text is not
    /// valid base64.
    pub fn decoded(&self) -> Result<Option<&[u8]>, ThumberError> {
        match &self.repr {
            None => Ok(None),
            Some(Repr::Decoded { bytes, .. }) => Ok(Some(bytes)),
            Some(Repr::Encoded { text, decoded }) => {
                if decoded.get().is_none() {
                    let bytes = BASE64.decode(text.as_bytes()).map_err(|e| {
                        ThumberError::MalformedPayload(format!("payload is not valid base64: {e}"))
                    })?;
                    let _ = decoded.set(bytes);
                }
                Ok(decoded.get().map(Vec::as_slice))
            }
        }
    }
}

/// Common envelope shared by requests and responses.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    /// Correlation id shared between a request and its response.
    pub nonce: Option<String>,
    /// Unix seconds at creation time.
    pub timestamp: Option<i64>,
    /// Raw HMAC-SHA256 digest over the canonical form.
    pub checksum: Option<Vec<u8>>,
    pub payload: Payload,
}

impl Envelope {
    /// Whether nonce, timestamp and checksum are all present.
    pub fn is_complete(&self) -> bool {
        self.nonce.is_some() && self.timestamp.is_some() && self.checksum.is_some()
    }

    /// Current wire value of an envelope field, `None` when unset.
    ///
    /// The checksum is carried through JSON as lowercase hex; the
    /// payload as its base64 text view.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "nonce" => self.nonce.clone().map(Value::from),
            "timestamp" => self.timestamp.map(Value::from),
            "checksum" => self.checksum.as_deref().map(|c| Value::from(hex::encode(c))),
            "data" => self.payload.encoded().map(Value::from),
            _ => None,
        }
    }

    /// Assigns a wire value to an envelope field. Returns `false` when
    /// the name is not an envelope field.
    pub fn set_field(&mut self, name: &str, value: &Value) -> Result<bool, ThumberError> {
        match name {
            "nonce" => self.nonce = Some(expect_string(name, value)?),
            "timestamp" => {
                self.timestamp = Some(value.as_i64().ok_or_else(|| {
                    ThumberError::MalformedPayload(format!("field {name} must be an integer"))
                })?);
            }
            "checksum" => {
                let text = expect_string(name, value)?;
                let bytes = hex::decode(&text).map_err(|e| {
                    ThumberError::MalformedPayload(format!("field {name} is not valid hex: {e}"))
                })?;
                self.checksum = Some(bytes);
            }
            "data" => self.payload.set_encoded(expect_string(name, value)?),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

pub(crate) fn expect_string(name: &str, value: &Value) -> Result<String, ThumberError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| ThumberError::MalformedPayload(format!("field {name} must be a string")))
}

/// Unix seconds now. Clamped to zero for clocks before the epoch.
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// The signed envelope contract shared by requests and responses.
///
/// Implementors declare an explicit field list and value accessors;
/// serialization, parsing and validity checks are provided on top and
/// shared with the signer (`crate::signing`).
pub trait Transaction: Default {
    /// Internal names of every field of this transaction type, in
    /// declaration order. Serialization follows this list, nothing is
    /// discovered at runtime.
    const FIELDS: &'static [&'static str];

    fn envelope(&self) -> &Envelope;

    /// Current wire value of an internal field, `None` when unset.
    fn field(&self, name: &str) -> Option<Value>;

    /// Assigns a parsed wire value to an internal field.
    fn set_field(&mut self, name: &str, value: &Value) -> Result<(), ThumberError>;

    /// Flat wire map of every set field, absent fields omitted.
    fn serialize(&self) -> WireMap {
        let mut map = WireMap::new();
        for &name in Self::FIELDS {
            if let Some(value) = self.field(name) {
                map.insert(wire::wire_name(name), value);
            }
        }
        map
    }

    /// Wire JSON text for `serialize`.
    fn to_json(&self) -> String {
        Value::Object(self.serialize()).to_string()
    }

    /// Reconstructs a transaction from wire bytes.
    ///
    /// Unknown wire keys are ignored for forward compatibility; a
    /// syntactically invalid payload is `MalformedPayload`.
    fn from_json(body: &[u8]) -> Result<Self, ThumberError> {
        let map = wire::parse(body)?;
        let mut transaction = Self::default();
        for (key, value) in &map {
            let name = wire::internal_name(key);
            if Self::FIELDS.contains(&name.as_str()) {
                transaction.set_field(&name, value)?;
            }
        }
        Ok(transaction)
    }

    /// Whether every field required for signing is present. Needs no
    /// secret; response types extend this with their own coupling rules.
    fn is_structurally_valid(&self) -> bool {
        self.envelope().is_complete()
    }

    /// Structural validity plus checksum verification under `secret`.
    fn is_valid(&self, secret: &str) -> bool {
        self.is_structurally_valid() && crate::signing::verify(self, secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoded_payload_encodes_lazily() {
        let mut payload = Payload::default();
        payload.set_decoded(b"hello world".to_vec());
        assert_eq!(payload.encoded(), Some("aGVsbG8gd29ybGQ="));
    }

    #[test]
    fn encoded_payload_decodes_lazily() {
        let mut payload = Payload::default();
        payload.set_encoded("aGVsbG8gd29ybGQ=".to_string());
        assert_eq!(payload.decoded().unwrap(), Some(&b"hello world"[..]));
    }

    #[test]
    fn setting_one_side_invalidates_the_other() {
        let mut payload = Payload::default();
        payload.set_decoded(b"first".to_vec());
        let _ = payload.encoded();
        payload.set_encoded(BASE64.encode(b"second"));
        assert_eq!(payload.decoded().unwrap(), Some(&b"second"[..]));
    }

    #[test]
    fn absent_payload_has_no_views() {
        let payload = Payload::default();
        assert!(payload.is_empty());
        assert_eq!(payload.encoded(), None);
        assert_eq!(payload.decoded().unwrap(), None);
    }

    #[test]
    fn invalid_base64_fails_on_decode() {
        let mut payload = Payload::default();
        payload.set_encoded("not base64!!!".to_string());
        assert!(matches!(
            payload.decoded(),
            Err(ThumberError::MalformedPayload(_))
        ));
    }

    #[test]
    fn envelope_checksum_round_trips_as_hex() {
        let mut envelope = Envelope::default();
        envelope.checksum = Some(vec![0xde, 0xad, 0xbe, 0xef]);
        let value = envelope.field("checksum").unwrap();
        assert_eq!(value, "deadbeef");

        let mut parsed = Envelope::default();
        assert!(parsed.set_field("checksum", &value).unwrap());
        assert_eq!(parsed.checksum, Some(vec![0xde, 0xad, 0xbe, 0xef]));
    }

    #[test]
    fn envelope_rejects_bad_field_types() {
        let mut envelope = Envelope::default();
        let err = envelope
            .set_field("timestamp", &Value::from("soon"))
            .unwrap_err();
        assert!(matches!(err, ThumberError::MalformedPayload(_)));
    }

    #[test]
    fn envelope_completeness_requires_all_three() {
        let mut envelope = Envelope::default();
        assert!(!envelope.is_complete());
        envelope.nonce = Some("abc".into());
        envelope.timestamp = Some(1000);
        assert!(!envelope.is_complete());
        envelope.checksum = Some(vec![0; 32]);
        assert!(envelope.is_complete());
    }
}
