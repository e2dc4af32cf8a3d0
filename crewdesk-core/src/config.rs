//! Configuration management

use crate::error::{CrewdeskError, CrewdeskResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration, usually read from `crewdesk.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrewdeskConfig {
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub lending: LendingConfig,
    pub logging: LoggingConfig,
}

/// Identity token and session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Name of the session cookie holding the raw identity token
    pub session_cookie: String,
    /// Lifetime of a minted identity token in seconds
    pub token_ttl_secs: i64,
    /// Client-side forced refresh interval in seconds
    pub refresh_interval_secs: u64,
    /// Accounts seeded into the local identity provider at startup.
    /// This is the only way an account can start out as `admin`.
    pub bootstrap_accounts: Vec<BootstrapAccount>,
}

impl AuthConfig {
    /// Interval at which signed-in clients re-mint their token
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie: "token".to_string(),
            token_ttl_secs: 3600,
            refresh_interval_secs: 10 * 60,
            bootstrap_accounts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAccount {
    pub email: String,
    pub password: String,
    /// Role claim as written in the token (`public`, `member`, ...)
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `sqlite:` URL for the device inventory; in-memory store when unset
    pub database_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LendingConfig {
    /// Webhook receiving lending requests; requests are only logged when unset
    pub webhook_url: Option<String>,
}

impl CrewdeskConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> CrewdeskResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CrewdeskError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: CrewdeskConfig = toml::from_str(&content).map_err(|e| CrewdeskError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> CrewdeskResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| CrewdeskError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| CrewdeskError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> CrewdeskResult<()> {
        if self.auth.session_cookie.is_empty()
            || !self
                .auth
                .session_cookie
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(crate::config_error!(
                "auth.session_cookie must be a non-empty token of [A-Za-z0-9_-]",
                "config"
            ));
        }

        if self.auth.token_ttl_secs <= 0 {
            return Err(crate::config_error!(
                "auth.token_ttl_secs must be greater than 0",
                "config"
            ));
        }

        if self.auth.refresh_interval_secs == 0 {
            return Err(crate::config_error!(
                "auth.refresh_interval_secs must be greater than 0",
                "config"
            ));
        }

        for account in &self.auth.bootstrap_accounts {
            if account.email.is_empty() || account.password.is_empty() {
                return Err(crate::validation_error!(
                    "bootstrap accounts need an email and a password",
                    "auth.bootstrap_accounts",
                    "config"
                ));
            }
        }

        if let Some(url) = &self.storage.database_url {
            if !url.starts_with("sqlite:") {
                return Err(crate::validation_error!(
                    format!("unsupported database url: {}", url),
                    "storage.database_url",
                    "config"
                ));
            }
        }

        Ok(())
    }
}
