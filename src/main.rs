use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;

use eventdash::api::{self, AppState};
use eventdash::auth::{self, UserStore};
use eventdash::cache::SheetCache;
use eventdash::config::AppConfig;
use eventdash::sheets::SheetsClient;

#[derive(Parser)]
#[command(name = "eventdash", about = "Event analytics dashboard backend")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the salted hash of a password, for pasting into the user table
    HashPassword { password: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventdash=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(Some(&cli.config))?;

    if let Some(Command::HashPassword { password }) = cli.command {
        // Offline helper; uses the configured salt and never starts the server.
        println!("{}", auth::hash_password(&config.auth.salt, &password));
        return Ok(());
    }

    if let Err(msg) = config.validate() {
        eprintln!("Configuration error: {msg}");
        return Err(msg.into());
    }

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        source = %config.sheet.source_id,
        ttl_secs = config.sheet.cache_ttl_secs,
        "starting eventdash"
    );

    let users = Arc::new(UserStore::from_config(&config.auth));
    let cache = Arc::new(SheetCache::new(Duration::from_secs(
        config.sheet.cache_ttl_secs,
    )));
    let sheets = SheetsClient::new(&config.sheet.api_base, &config.sheet.api_key);
    let state = Arc::new(AppState {
        cache,
        sheets,
        users,
        default_source: config.sheet.source_id.clone(),
    });

    let app = api::router(state).layer(CorsLayer::permissive());

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
