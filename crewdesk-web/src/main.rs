//! Crewdesk Web Server
//!
//! Crew administration and equipment inventory for a student video group.

use anyhow::Context;
use clap::Parser;
use crewdesk_core::{init_logging, LogFormat, LoggingConfig};
use crewdesk_web::server::CrewdeskServerBuilder;
use std::path::PathBuf;
use tracing::info;

/// Crewdesk Web Server
#[derive(Parser)]
#[command(name = "crewdesk-web")]
#[command(about = "Crew administration and equipment inventory")]
#[command(version)]
struct Args {
    /// Server host to bind to, overrides CREWDESK_HOST
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on, overrides CREWDESK_PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable development mode
    #[arg(long)]
    dev: bool,

    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database URL for the device inventory
    #[arg(long)]
    database_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load environment variables
    dotenvy::dotenv().ok();

    let mut builder = CrewdeskServerBuilder::new();
    if let Some(host) = args.host.clone() {
        builder = builder.host(host);
    }
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    if args.dev {
        builder = builder.dev_mode(true);
    }
    if let Some(path) = args.config.clone() {
        builder = builder.config_path(path);
    }
    if let Some(url) = args.database_url.clone() {
        builder = builder.database_url(url);
    }

    let mut settings = builder
        .web_config()
        .load_settings()
        .context("Failed to load settings")?;

    settings.logging = logging_overrides(settings.logging, &args);
    init_logging(&settings.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))?;

    info!("Starting Crewdesk Web Server initialization");

    let server = builder
        .settings(settings)
        .build()
        .await
        .context("Failed to build server")?;

    server.start().await.context("Server failed")?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Apply `--log-level` and `--json-logs` on top of the configured logging
fn logging_overrides(mut logging: LoggingConfig, args: &Args) -> LoggingConfig {
    if let Some(level) = &args.log_level {
        logging = logging.with_level(level);
    }
    if args.json_logs {
        logging.format = LogFormat::Json;
    }
    logging
}
