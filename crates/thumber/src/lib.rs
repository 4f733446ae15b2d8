pub mod client;
pub mod error;
pub mod signing;
pub mod transaction;
pub mod webhook;
pub mod wire;

pub use client::{Client, ClientConfig, HttpTransport, SendOutcome, Transport, TransportReply};
pub use error::ThumberError;
pub use signing::{canonical_form, compute_checksum, generate_nonce, verify};
pub use transaction::{Envelope, Payload, ThumbnailRequest, ThumbnailResponse, Transaction};
pub use webhook::{AppState, ResponseHandler, router, run};
