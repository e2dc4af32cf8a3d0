//! Crewdesk Web Server
//!
//! Server-rendered admin pages and the JSON API of the crew administration app.
//! Every page and mutating endpoint re-checks the caller's identity token on each
//! request; see [`auth`].

pub mod auth;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;
pub mod templates;

// Re-export main types
pub use server::CrewdeskServer;
pub use state::AppState;

use axum::{extract::DefaultBodyLimit, Router};
use crewdesk_core::CrewdeskConfig;
use std::path::PathBuf;
use tower_http::trace::TraceLayer;

/// Signing secret used when `CREWDESK_JWT_SECRET` is not set
pub const DEV_JWT_SECRET: &str = "crewdesk-dev-secret-change-in-production";

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::page_routes())
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(state)
}

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable development mode
    pub dev_mode: bool,
    /// TOML settings file; defaults are used when unset
    pub config_path: Option<PathBuf>,
    /// Database URL, overrides `storage.database_url` from the settings file
    pub database_url: Option<String>,
    /// HMAC secret for identity tokens
    pub jwt_secret: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            dev_mode: false,
            config_path: None,
            database_url: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
        }
    }
}

impl WebConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("CREWDESK_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("CREWDESK_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            dev_mode: std::env::var("CREWDESK_DEV_MODE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            config_path: std::env::var("CREWDESK_CONFIG").ok().map(PathBuf::from),
            database_url: std::env::var("DATABASE_URL").ok(),
            jwt_secret: std::env::var("CREWDESK_JWT_SECRET")
                .unwrap_or_else(|_| DEV_JWT_SECRET.to_string()),
        }
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Read the settings file (if any) and apply the overrides held here
    pub fn load_settings(&self) -> WebResult<CrewdeskConfig> {
        let mut settings = match &self.config_path {
            Some(path) => CrewdeskConfig::from_file(path)?,
            None => CrewdeskConfig::default(),
        };

        if let Some(url) = &self.database_url {
            settings.storage.database_url = Some(url.clone());
            settings.validate()?;
        }

        Ok(settings)
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crewdesk_core::CrewdeskError),

    #[error("Application error: {0}")]
    Application(#[from] crewdesk_applications::ApplicationError),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;
