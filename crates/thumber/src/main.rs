use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use thumber::{AppState, ClientConfig, ResponseHandler, run};

#[derive(Parser)]
struct Args {
    #[clap(long, default_value = "127.0.0.1")]
    host: String,
    #[clap(long, default_value = "3000")]
    port: u16,
    #[clap(long, env = "THUMBER_UID")]
    uid: String,
    #[clap(long, env = "THUMBER_SECRET")]
    secret: String,
    #[clap(long, env = "THUMBER_CALLBACK")]
    callback: String,
    /// Directory to write received thumbnails into, named by nonce.
    #[clap(long, env = "THUMBER_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = ClientConfig::new(args.uid, args.secret, args.callback);

    let output_dir = args.output_dir;
    let handler: ResponseHandler = Arc::new(move |response| {
        let nonce = response.envelope.nonce.clone().unwrap_or_default();
        if response.success != Some(true) {
            warn!(
                %nonce,
                error = response.error.as_deref().unwrap_or(""),
                "thumbnail generation failed"
            );
            return;
        }

        let Some(dir) = &output_dir else {
            info!(%nonce, "thumbnail received (no output directory configured)");
            return;
        };
        match response.envelope.payload.decoded() {
            Ok(Some(bytes)) => {
                let path = dir.join(&nonce);
                if let Err(e) = std::fs::write(&path, bytes) {
                    error!(%nonce, path = %path.display(), "writing thumbnail: {e}");
                } else {
                    info!(%nonce, path = %path.display(), "thumbnail written");
                }
            }
            Ok(None) => warn!(%nonce, "successful response carried no payload"),
            Err(e) => error!(%nonce, "decoding thumbnail payload: {e}"),
        }
    });

    let state = AppState {
        config: Arc::new(config),
        handler,
    };

    run(args.host, args.port, state)
        .await
        .context("running webhook receiver")
}
