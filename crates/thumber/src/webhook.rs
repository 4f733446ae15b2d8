use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::info;

use crate::client::ClientConfig;
use crate::error::ThumberError;
use crate::transaction::ThumbnailResponse;

/// Application callback invoked with each validated response.
pub type ResponseHandler = Arc<dyn Fn(ThumbnailResponse) + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ClientConfig>,
    pub handler: ResponseHandler,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/healthcheck",
            get(|| async move { (StatusCode::OK, "Ok").into_response() }),
        )
        .route("/thumbnail", post(thumbnail_handler))
        .with_state(state)
}

/// Receives the service's asynchronous POST. Only responses that parse
/// and verify reach the application handler; everything else maps to an
/// error status via `ThumberError`.
async fn thumbnail_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ThumberError> {
    let response = ThumbnailResponse::parse_and_validate(&body, &state.config.secret)?;

    info!(
        nonce = response.envelope.nonce.as_deref().unwrap_or(""),
        success = response.success.unwrap_or(false),
        "validated thumbnail response"
    );
    (state.handler)(response);

    Ok((StatusCode::OK, "Ok"))
}

pub async fn run(host: String, port: u16, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .context("binding webhook listener")?;
    info!(%host, port, "webhook receiver listening");

    axum::serve(listener, router(state))
        .await
        .context("serving webhook receiver")?;

    Ok(())
}
