//! accountd - minimal user-account backend
//!
//! Serves registration, login, token verification, and user record
//! endpoints over HTTP, backed by a relational database.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use accountd_api::{ApiServer, ApiServerConfig};

/// accountd - user accounts with bearer session tokens
#[derive(Parser, Debug)]
#[command(name = "accountd")]
#[command(about = "User-account backend with bearer session tokens")]
#[command(version)]
struct Cli {
    /// Address to bind the API server
    #[arg(long, env = "ACCOUNTD_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Database URL (sqlite or postgres)
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite::memory:")]
    database_url: String,

    /// Secret used to sign and verify session tokens (must be non-empty)
    #[arg(long, env = "ACCOUNTD_JWT_SECRET")]
    jwt_secret: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,
}

/// Setup logging with the specified log level
fn setup_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level);

    info!("Starting accountd {}", env!("CARGO_PKG_VERSION"));

    let db = accountd_db::connect(&cli.database_url)
        .await
        .context("Failed to connect to database")?;

    accountd_db::migrate(&db)
        .await
        .context("Failed to run database migrations")?;

    let config = ApiServerConfig {
        bind_addr: cli.bind,
        enable_cors: !cli.no_cors,
        jwt_secret: cli.jwt_secret,
    };

    // An empty secret is a fatal configuration error at startup
    let server = ApiServer::new(config, db).context("Invalid session-token signing secret")?;

    server.start().await
}
