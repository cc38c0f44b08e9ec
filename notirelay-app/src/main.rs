mod config;
mod http;

use crate::config::Config;
use crate::http::ingest::HttpIngestExtensions;
use clap::{Parser, Subcommand};
use notirelay_core::credentials::cipher::{AesGcmCipher, Cipher};
use notirelay_core::credentials::CredentialResolver;
use notirelay_core::pipeline::runner::PipelineRunner;
use notirelay_core::recorder::BaseRecorder;
use notirelay_core::schema::SchemaGateway;
use notirelay_notion::{NotionClient, DEFAULT_API_URL};
use notirelay_webhook::WebhookSender;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

#[derive(Parser, Debug)]
struct Args {
    /// 64 hex characters (32 bytes).
    #[clap(long, env = "NOTIRELAY_ENCRYPTION_KEY", hide_env_values = true)]
    encryption_key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the Notion webhook endpoint.
    Run {
        /// TOML file with templates, destinations and credentials.
        #[clap(long, env = "NOTIRELAY_CONFIG", default_value = "notirelay.toml")]
        config: PathBuf,
        #[clap(long, env = "NOTIRELAY_BIND", default_value = "[::]:8080")]
        bind: SocketAddr,
        #[clap(long, env = "NOTIRELAY_NOTION_API_URL", default_value = DEFAULT_API_URL)]
        notion_api_url: Url,
    },
    /// Encrypt an integration token for the `credentials` section of the config.
    Seal { token: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "notirelay=info,warn");
    }

    let args = Args::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cipher = Arc::new(AesGcmCipher::from_hex_key(&args.encryption_key)?);

    match args.command {
        Commands::Seal { token } => {
            println!("{}", cipher.encrypt(&token)?);
        }
        Commands::Run {
            config,
            bind,
            notion_api_url,
        } => {
            let stores = Config::load(&config)?.into_stores();
            debug!(config = %config.display(), "Loaded stores");

            let client = reqwest::Client::new();
            let notion = Arc::new(NotionClient::new(client.clone(), notion_api_url));

            let runner = PipelineRunner::new(
                Arc::new(stores.templates),
                Arc::new(stores.destinations),
                CredentialResolver::new(Arc::new(stores.credentials), cipher),
                SchemaGateway::new(notion),
                Arc::new(WebhookSender::new(client)),
                Arc::new(BaseRecorder::new()),
            );

            info!("Starting HTTP ingest server on {}", bind);
            let ext = HttpIngestExtensions {
                runner: Arc::new(runner),
            };
            http::ingest::start(bind, ext).await?;

            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        }
    }
    Ok(())
}
