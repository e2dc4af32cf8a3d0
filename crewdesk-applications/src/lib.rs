//! Crewdesk Applications - roles, identity and the equipment inventory
//!
//! This crate holds everything the web layer builds on:
//!
//! - Role policy and identity provider seam ([`auth`])
//! - Client-side auth context with periodic token refresh ([`auth::context`])
//! - Device inventory model, stores and edit rules ([`devices`])
//! - Lending request forwarding ([`lending`])
//!
//! ## Architecture
//!
//! - **Core** (crewdesk-core): errors, logging, configuration
//! - **Applications** (this crate): domain logic, storage seams
//! - **Presentation** (crewdesk-web): HTTP routes, guards, pages

pub mod auth;
pub mod devices;
pub mod lending;

use crewdesk_core::{AuthConfig, LendingConfig, StorageConfig};
use std::sync::Arc;
use tracing::{info, warn};

pub use auth::{
    is_authorized, AllowSet, AuthContext, AuthSnapshot, IdentityError, IdentityProvider,
    IdentityRecord, LocalIdentityProvider, Role, VerifiedClaims,
};
pub use devices::{
    Device, DeviceError, DeviceService, DeviceStatus, DeviceStore, DeviceStoreError,
    MemoryDeviceStore,
};
pub use lending::{LendingError, LendingNotifier, LendingRequest, LogNotifier, WebhookNotifier};

/// Application-level error type
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error("Core error: {0}")]
    Core(#[from] crewdesk_core::CrewdeskError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Device storage error: {0}")]
    DeviceStore(#[from] DeviceStoreError),

    #[error("Lending error: {0}")]
    Lending(#[from] LendingError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;

impl ApplicationError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Seed the configured bootstrap accounts into a local provider.
///
/// Accounts whose email is already registered are skipped, so a restart with
/// the same configuration is harmless. Returns the number of created accounts.
pub fn seed_bootstrap_accounts(
    provider: &LocalIdentityProvider,
    config: &AuthConfig,
) -> ApplicationResult<usize> {
    let mut seeded = 0;
    for account in &config.bootstrap_accounts {
        let role = account
            .role
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()
            .map_err(ApplicationError::config)?;

        match provider.seed_account(&account.email, &account.password, role) {
            Ok(_) => seeded += 1,
            Err(IdentityError::EmailTaken) => {
                warn!("Bootstrap account {} already exists", account.email);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(seeded)
}

/// Open the configured device store, in memory when no database is set
pub async fn open_device_store(config: &StorageConfig) -> ApplicationResult<Arc<dyn DeviceStore>> {
    match &config.database_url {
        #[cfg(feature = "sqlite")]
        Some(url) => {
            let store = devices::SqliteDeviceStore::connect(url).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        Some(url) => Err(ApplicationError::config(format!(
            "database_url {} requires the sqlite feature",
            url
        ))),
        None => {
            info!("No database configured, using in-memory device store");
            Ok(Arc::new(MemoryDeviceStore::new()))
        }
    }
}

/// Webhook notifier when a URL is configured, log-only otherwise
pub fn lending_notifier(config: &LendingConfig) -> Arc<dyn LendingNotifier> {
    match &config.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => Arc::new(LogNotifier),
    }
}
