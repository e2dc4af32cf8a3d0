//! Crewdesk Web Server
//!
//! Main web server implementation using Axum.

use crate::{create_app, AppState, WebConfig, WebError, WebResult, DEV_JWT_SECRET};
use axum::serve;
use crewdesk_core::CrewdeskConfig;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Main Crewdesk web server
pub struct CrewdeskServer {
    config: WebConfig,
    state: AppState,
}

impl CrewdeskServer {
    /// Create a new server, loading settings from the configured file
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let settings = config.load_settings()?;
        Self::with_settings(config, settings).await
    }

    /// Create a new server from already loaded settings
    pub async fn with_settings(config: WebConfig, settings: CrewdeskConfig) -> WebResult<Self> {
        if config.jwt_secret == DEV_JWT_SECRET && !config.dev_mode {
            warn!("CREWDESK_JWT_SECRET is not set, using the development secret");
        }

        let state = AppState::new(config.clone(), settings).await?;
        Ok(Self { config, state })
    }

    /// Start the web server
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();

        info!("Starting Crewdesk Web Server");
        info!("Server address: http://{}", address);
        info!("Development mode: {}", self.config.dev_mode);

        let app = create_app(self.state.clone());

        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("Server listening on http://{}", address);

        if let Err(e) = serve(listener, app).await {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Builder for CrewdeskServer
pub struct CrewdeskServerBuilder {
    config: WebConfig,
    settings: Option<CrewdeskConfig>,
}

impl CrewdeskServerBuilder {
    /// Create a new server builder starting from the environment
    pub fn new() -> Self {
        Self {
            config: WebConfig::from_env(),
            settings: None,
        }
    }

    /// Set the server host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Enable development mode
    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.config.dev_mode = dev_mode;
        self
    }

    /// Set the settings file
    pub fn config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.config_path = Some(path.into());
        self
    }

    /// Set database URL
    pub fn database_url<S: Into<String>>(mut self, database_url: S) -> Self {
        self.config.database_url = Some(database_url.into());
        self
    }

    /// Use settings that were loaded elsewhere instead of reading the file again
    pub fn settings(mut self, settings: CrewdeskConfig) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn web_config(&self) -> &WebConfig {
        &self.config
    }

    /// Build the server
    pub async fn build(self) -> WebResult<CrewdeskServer> {
        match self.settings {
            Some(settings) => CrewdeskServer::with_settings(self.config, settings).await,
            None => CrewdeskServer::new(self.config).await,
        }
    }
}

impl Default for CrewdeskServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
