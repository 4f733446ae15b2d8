use serde_json::Value;

use super::{Envelope, Transaction, expect_string, unix_timestamp};
use crate::client::ClientConfig;
use crate::error::ThumberError;
use crate::signing;

/// A signed thumbnail job submission.
///
/// The job parameter fields (`url`, `mime_type`, `geometry`, `pg`) are
/// carried opaquely; their meaning is the remote service's contract.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailRequest {
    pub envelope: Envelope,
    /// Submitter account id. Defaulted from client config when empty.
    pub uid: Option<String>,
    /// Where the service delivers the response. Defaulted from config.
    pub callback: Option<String>,
    /// Source document reference.
    pub url: Option<String>,
    /// MIME type of the source document.
    pub mime_type: Option<String>,
    /// Output size constraint, e.g. `100x100`.
    pub geometry: Option<String>,
    /// Page of the source document to render.
    pub pg: Option<u32>,
}

impl ThumbnailRequest {
    /// Stamps the request for submission: sets the timestamp, fills
    /// `uid` and `callback` from `config` when empty, generates a nonce
    /// when absent, then computes and sets the checksum.
    ///
    /// A request that still fails validation afterwards is a
    /// protocol-construction bug and surfaces as `Precondition`; it
    /// must never reach the wire.
    pub fn prepare_for_send(&mut self, config: &ClientConfig) -> Result<(), ThumberError> {
        self.envelope.timestamp = Some(unix_timestamp());
        if self.uid.as_deref().is_none_or(str::is_empty) {
            self.uid = Some(config.uid.clone());
        }
        if self.callback.as_deref().is_none_or(str::is_empty) {
            self.callback = Some(config.callback.clone());
        }
        if self.envelope.nonce.is_none() {
            self.envelope.nonce = Some(signing::generate_nonce());
        }
        self.envelope.checksum = Some(signing::compute_checksum(self, &config.secret));

        if !self.is_valid(&config.secret) {
            return Err(ThumberError::Precondition(
                "request does not verify under its own checksum".into(),
            ));
        }
        Ok(())
    }
}

impl Transaction for ThumbnailRequest {
    const FIELDS: &'static [&'static str] = &[
        "nonce", "timestamp", "checksum", "data", "uid", "callback", "url", "mimeType",
        "geometry", "pg",
    ];

    fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "uid" => self.uid.clone().map(Value::from),
            "callback" => self.callback.clone().map(Value::from),
            "url" => self.url.clone().map(Value::from),
            "mimeType" => self.mime_type.clone().map(Value::from),
            "geometry" => self.geometry.clone().map(Value::from),
            "pg" => self.pg.map(Value::from),
            _ => self.envelope.field(name),
        }
    }

    fn set_field(&mut self, name: &str, value: &Value) -> Result<(), ThumberError> {
        if self.envelope.set_field(name, value)? {
            return Ok(());
        }
        match name {
            "uid" => self.uid = Some(expect_string(name, value)?),
            "callback" => self.callback = Some(expect_string(name, value)?),
            "url" => self.url = Some(expect_string(name, value)?),
            "mimeType" => self.mime_type = Some(expect_string(name, value)?),
            "geometry" => self.geometry = Some(expect_string(name, value)?),
            "pg" => {
                self.pg = Some(
                    value
                        .as_u64()
                        .and_then(|v| u32::try_from(v).ok())
                        .ok_or_else(|| {
                            ThumberError::MalformedPayload(format!(
                                "field {name} must be an unsigned integer"
                            ))
                        })?,
                );
            }
            _ => {}
        }
        Ok(())
    }

    /// A request also needs a submitter before it can be sent.
    fn is_structurally_valid(&self) -> bool {
        self.envelope.is_complete() && self.uid.is_some()
    }
}
