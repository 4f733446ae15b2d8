use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ThumberError;
use crate::transaction::{ThumbnailRequest, ThumbnailResponse, Transaction};

/// Path for submitting a new thumbnail job.
pub const CREATE_PATH: &str = "/create.json";

/// Path for the supported MIME type listing.
pub const MIME_TYPES_PATH: &str = "/mime_types.json";

const DEFAULT_BASE_URL: &str = "https://api.thumber.co";

/// Process-wide client configuration.
///
/// Built once at startup and shared read-only; requests in flight all
/// see the same credentials and callback address.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Account id stamped onto requests that carry none.
    pub uid: String,
    /// Shared secret for checksum computation and verification.
    pub secret: String,
    /// Default callback address for response delivery.
    pub callback: String,
    /// Service base URL, scheme included.
    pub base_url: String,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(uid: String, secret: String, callback: String) -> Self {
        Self {
            uid,
            secret,
            callback,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("thumber-client/{} (rust)", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

/// What came back from the transport for one exchange.
#[derive(Debug, Serialize)]
pub struct TransportReply {
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    #[serde(with = "body_as_text")]
    pub body: Vec<u8>,
    pub final_url: String,
}

mod body_as_text {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(body))
    }
}

/// The network seam consumed by the client.
///
/// Retry, backoff and timeout policy live behind this trait, not in the
/// protocol core. Failures surface as `ThumberError::Transport`,
/// unchanged.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<TransportReply, ThumberError>;
}

/// Production transport on top of `reqwest`.
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self, ThumberError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| ThumberError::Transport(format!("building HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        body: Option<Vec<u8>>,
    ) -> Result<TransportReply, ThumberError> {
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|e| ThumberError::Transport(format!("invalid method: {e}")))?;

        let mut request = self.http.request(method, url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ThumberError::Transport(e.to_string()))?;

        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| ThumberError::Transport(e.to_string()))?
            .to_vec();

        Ok(TransportReply {
            status_code,
            headers,
            body,
            final_url,
        })
    }
}

/// Outcome of a submitted request: the transport reply plus the nonce
/// the eventual response will echo.
#[derive(Debug, Serialize)]
pub struct SendOutcome {
    pub nonce: String,
    pub reply: TransportReply,
}

/// Sends signed requests and validates inbound responses.
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ThumberError> {
        let transport = Arc::new(HttpTransport::new(&config.user_agent)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Injects a transport. Tests use this with an in-memory fake.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Stamps and signs `request`, then POSTs its wire form to the
    /// create endpoint. The request is guaranteed valid when it leaves.
    pub async fn send(&self, mut request: ThumbnailRequest) -> Result<SendOutcome, ThumberError> {
        request.prepare_for_send(&self.config)?;
        let nonce = request.envelope.nonce.clone().unwrap_or_default();

        let json = request.to_json();
        debug!(%nonce, bytes = json.len(), "submitting thumbnail request");

        let url = format!("{}{}", self.config.base_url, CREATE_PATH);
        let headers = [
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Content-Length".to_string(), json.len().to_string()),
        ];
        let reply = self
            .transport
            .send("POST", &url, &headers, Some(json.into_bytes()))
            .await?;

        info!(%nonce, status = reply.status_code, "thumbnail request submitted");
        Ok(SendOutcome { nonce, reply })
    }

    /// Lists the MIME types the service accepts as source documents.
    pub async fn mime_types(&self) -> Result<Value, ThumberError> {
        let url = format!("{}{}", self.config.base_url, MIME_TYPES_PATH);
        let headers = [
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Content-Length".to_string(), "0".to_string()),
        ];
        let reply = self.transport.send("GET", &url, &headers, None).await?;
        serde_json::from_slice(&reply.body)
            .map_err(|e| ThumberError::MalformedPayload(format!("invalid JSON: {e}")))
    }

    /// Webhook entry point: validates an inbound response body under
    /// the configured secret.
    pub fn receive(&self, body: &[u8]) -> Result<ThumbnailResponse, ThumberError> {
        ThumbnailResponse::parse_and_validate(body, &self.config.secret)
    }
}
