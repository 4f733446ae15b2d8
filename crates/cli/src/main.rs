use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use thumber::{Client, ClientConfig, ThumbnailRequest};

#[derive(Parser)]
struct Args {
    #[clap(long, env = "THUMBER_UID")]
    uid: String,
    #[clap(long, env = "THUMBER_SECRET")]
    secret: String,
    #[clap(long, env = "THUMBER_CALLBACK", default_value = "")]
    callback: String,
    #[clap(long, env = "THUMBER_BASE_URL")]
    base_url: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a thumbnail job for a source document.
    Create {
        /// Source document URL.
        #[clap(long)]
        url: String,
        #[clap(long)]
        mime_type: Option<String>,
        /// Output size constraint, e.g. 100x100.
        #[clap(long)]
        geometry: Option<String>,
        /// Page of the document to render.
        #[clap(long)]
        pg: Option<u32>,
    },
    /// List the MIME types the service accepts.
    MimeTypes,
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
    let mut config = ClientConfig::new(args.uid, args.secret, args.callback);
    if let Some(base_url) = args.base_url {
        config = config.with_base_url(base_url);
    }
    let client = Client::new(config).context("building client")?;

    match args.command {
        Command::Create {
            url,
            mime_type,
            geometry,
            pg,
        } => {
            let request = ThumbnailRequest {
                url: Some(url),
                mime_type,
                geometry,
                pg,
                ..Default::default()
            };
            let outcome = client.send(request).await.context("submitting request")?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::MimeTypes => {
            let types = client.mime_types().await.context("fetching MIME types")?;
            println!("{}", serde_json::to_string_pretty(&types)?);
        }
    }

    Ok(())
}
