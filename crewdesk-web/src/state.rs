//! Application state shared by all handlers

use crate::{WebConfig, WebResult};
use crewdesk_applications::{
    lending_notifier, open_device_store, seed_bootstrap_accounts, DeviceService, DeviceStore,
    IdentityProvider, LendingNotifier, LocalIdentityProvider,
};
use crewdesk_core::CrewdeskConfig;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: WebConfig,
    /// Settings loaded from the TOML file
    pub settings: Arc<CrewdeskConfig>,
    /// Identity provider owning accounts and role claims
    pub identity: Arc<dyn IdentityProvider>,
    /// Device inventory
    pub devices: DeviceService,
    /// Lending request delivery
    pub lending: Arc<dyn LendingNotifier>,
}

impl AppState {
    /// Build the state with the local identity provider and the configured stores
    pub async fn new(config: WebConfig, settings: CrewdeskConfig) -> WebResult<Self> {
        let provider = LocalIdentityProvider::builder(&config.jwt_secret)
            .token_ttl(chrono::Duration::seconds(settings.auth.token_ttl_secs))
            .build();

        let seeded = seed_bootstrap_accounts(&provider, &settings.auth)?;
        if seeded > 0 {
            info!("Seeded {} bootstrap accounts", seeded);
        }

        let device_store = open_device_store(&settings.storage).await?;
        let lending = lending_notifier(&settings.lending);

        Ok(Self::from_services(
            config,
            settings,
            Arc::new(provider),
            device_store,
            lending,
        ))
    }

    /// Assemble the state from already constructed services
    pub fn from_services(
        config: WebConfig,
        settings: CrewdeskConfig,
        identity: Arc<dyn IdentityProvider>,
        device_store: Arc<dyn DeviceStore>,
        lending: Arc<dyn LendingNotifier>,
    ) -> Self {
        Self {
            config,
            settings: Arc::new(settings),
            identity,
            devices: DeviceService::new(device_store),
            lending,
        }
    }

    /// Name of the session cookie
    pub fn cookie_name(&self) -> &str {
        &self.settings.auth.session_cookie
    }
}
