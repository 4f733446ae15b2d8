use axum::http::StatusCode;
use axum_core::response::{IntoResponse as AxumCoreIntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum ThumberError {
    #[error("Malformed wire payload: {0}")]
    MalformedPayload(String),
    #[error("Checksum does not match transaction contents")]
    InvalidSignature,
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Request failed validation after stamping: {0}")]
    Precondition(String),
}

/// Trait implementation to convert this error into an axum http response
impl AxumCoreIntoResponse for ThumberError {
    fn into_response(self) -> Response {
        match self {
            malformed_error @ ThumberError::MalformedPayload(_) => {
                (StatusCode::BAD_REQUEST, malformed_error.to_string()).into_response()
            }
            signature_error @ ThumberError::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, signature_error.to_string()).into_response()
            }
            invalid_error @ ThumberError::InvalidTransaction(_) => {
                (StatusCode::BAD_REQUEST, invalid_error.to_string()).into_response()
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something wrong happened.",
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_payload_returns_400() {
        let error = ThumberError::MalformedPayload("not json".into());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_signature_returns_401() {
        let error = ThumberError::InvalidSignature;
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn invalid_transaction_returns_400() {
        let error = ThumberError::InvalidTransaction("missing nonce".into());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn transport_error_returns_500() {
        let error = ThumberError::Transport("connection refused".into());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn precondition_error_returns_500() {
        let error = ThumberError::Precondition("unsigned request".into());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
