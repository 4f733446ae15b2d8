use serde_json::Value;

use super::{Envelope, Transaction, expect_string};
use crate::error::ThumberError;
use crate::signing;

/// The asynchronous outcome of a thumbnail request, delivered to the
/// callback address and verified before it reaches application code.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailResponse {
    pub envelope: Envelope,
    /// Whether the originating request succeeded.
    pub success: Option<bool>,
    /// Failure reason when `success` is false.
    pub error: Option<String>,
}

impl ThumbnailResponse {
    /// Webhook entry point: parse wire bytes, then validate under
    /// `secret`. Never hands back a partially-valid response.
    pub fn parse_and_validate(body: &[u8], secret: &str) -> Result<Self, ThumberError> {
        let response = Self::from_json(body)?;
        if !response.is_structurally_valid() {
            return Err(ThumberError::InvalidTransaction(
                response.structural_defect().into(),
            ));
        }
        if !signing::verify(&response, secret) {
            return Err(ThumberError::InvalidSignature);
        }
        Ok(response)
    }

    fn structural_defect(&self) -> &'static str {
        if !self.envelope.is_complete() {
            "missing nonce, timestamp or checksum"
        } else if self.success.is_none() {
            "missing success flag"
        } else if self.success == Some(true) {
            "successful response carries no payload"
        } else {
            "failed response carries no error message"
        }
    }
}

impl Transaction for ThumbnailResponse {
    const FIELDS: &'static [&'static str] =
        &["nonce", "timestamp", "checksum", "data", "success", "error"];

    fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "success" => self.success.map(Value::from),
            "error" => self.error.clone().map(Value::from),
            _ => self.envelope.field(name),
        }
    }

    fn set_field(&mut self, name: &str, value: &Value) -> Result<(), ThumberError> {
        if self.envelope.set_field(name, value)? {
            return Ok(());
        }
        match name {
            "success" => {
                self.success = Some(value.as_bool().ok_or_else(|| {
                    ThumberError::MalformedPayload(format!("field {name} must be a boolean"))
                })?);
            }
            "error" => self.error = Some(expect_string(name, value)?),
            _ => {}
        }
        Ok(())
    }

    /// Success and error are coupled: a successful response must carry
    /// a non-empty payload, a failed one must carry an error message.
    fn is_structurally_valid(&self) -> bool {
        let coupled = match self.success {
            Some(true) => self.envelope.payload.encoded().is_some_and(|d| !d.is_empty()),
            Some(false) => self.error.is_some(),
            None => false,
        };
        self.envelope.is_complete() && coupled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_envelope() -> Envelope {
        Envelope {
            nonce: Some("abc".into()),
            timestamp: Some(1000),
            checksum: Some(vec![0; 32]),
            ..Default::default()
        }
    }

    #[test]
    fn success_requires_payload() {
        let mut response = ThumbnailResponse {
            envelope: complete_envelope(),
            success: Some(true),
            error: None,
        };
        assert!(!response.is_structurally_valid());
        response.envelope.payload.set_decoded(b"thumbnail".to_vec());
        assert!(response.is_structurally_valid());
    }

    #[test]
    fn failure_requires_error_message() {
        let mut response = ThumbnailResponse {
            envelope: complete_envelope(),
            success: Some(false),
            error: None,
        };
        assert!(!response.is_structurally_valid());
        response.error = Some("bad source".into());
        assert!(response.is_structurally_valid());
    }

    #[test]
    fn empty_encoded_payload_does_not_count() {
        let mut response = ThumbnailResponse {
            envelope: complete_envelope(),
            success: Some(true),
            error: None,
        };
        response.envelope.payload.set_encoded(String::new());
        assert!(!response.is_structurally_valid());
    }

    #[test]
    fn missing_success_flag_is_invalid() {
        let response = ThumbnailResponse {
            envelope: complete_envelope(),
            success: None,
            error: Some("bad source".into()),
        };
        assert!(!response.is_structurally_valid());
    }

    #[test]
    fn parse_and_validate_rejects_garbage() {
        let err = ThumbnailResponse::parse_and_validate(b"{oops", "secret").unwrap_err();
        assert!(matches!(err, ThumberError::MalformedPayload(_)));
    }

    #[test]
    fn parse_and_validate_rejects_incomplete() {
        let err =
            ThumbnailResponse::parse_and_validate(br#"{"nonce":"abc"}"#, "secret").unwrap_err();
        assert!(matches!(err, ThumberError::InvalidTransaction(_)));
    }
}
