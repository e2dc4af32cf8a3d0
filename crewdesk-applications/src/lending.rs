//! Lending requests
//!
//! A crew member picks devices and a date range in the inventory table; the
//! request is forwarded to an outbound webhook that turns it into an email.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum LendingError {
    #[error("Invalid lending request: {0}")]
    Invalid(String),
    #[error("Webhook delivery failed: {0}")]
    Delivery(String),
}

impl From<reqwest::Error> for LendingError {
    fn from(e: reqwest::Error) -> Self {
        LendingError::Delivery(e.to_string())
    }
}

pub type LendingResult<T> = Result<T, LendingError>;

/// A device reference as sent by the lending dialog: either the full device
/// document or just its id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LendingDevice {
    Id(String),
    Document { id: String },
}

impl LendingDevice {
    pub fn id(&self) -> &str {
        match self {
            LendingDevice::Id(id) | LendingDevice::Document { id } => id,
        }
    }
}

/// Body of `POST /api/email`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LendingRequest {
    pub devices: Option<Vec<LendingDevice>>,
    pub from_date: Option<String>,
    pub until_date: Option<String>,
    pub comments: Option<String>,
}

/// Webhook payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LendingPayload {
    pub value1: String,
    pub value2: String,
    pub value3: String,
}

impl LendingRequest {
    /// Build the payload for a requester. Devices and both dates are required.
    pub fn into_payload(self, requester_email: &str) -> LendingResult<LendingPayload> {
        let devices = match self.devices {
            Some(devices) if !devices.is_empty() => devices,
            _ => return Err(LendingError::Invalid("devices are required".to_string())),
        };
        let from = non_empty(self.from_date, "fromDate")?;
        let until = non_empty(self.until_date, "untilDate")?;

        let ids: Vec<&str> = devices.iter().map(LendingDevice::id).collect();
        Ok(LendingPayload {
            value1: ids.join(";"),
            value2: format!("{} - {} ({})", from, until, requester_email),
            value3: self.comments.unwrap_or_default(),
        })
    }
}

fn non_empty(value: Option<String>, field: &str) -> LendingResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(LendingError::Invalid(format!("{} is required", field))),
    }
}

#[async_trait]
pub trait LendingNotifier: Send + Sync {
    async fn notify(&self, payload: &LendingPayload) -> LendingResult<()>;
}

/// Posts the payload as JSON to a webhook URL
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl LendingNotifier for WebhookNotifier {
    async fn notify(&self, payload: &LendingPayload) -> LendingResult<()> {
        debug!("Posting lending request to webhook");
        self.client
            .post(&self.url)
            .json(payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Logs lending requests instead of delivering them
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl LendingNotifier for LogNotifier {
    async fn notify(&self, payload: &LendingPayload) -> LendingResult<()> {
        info!(
            devices = %payload.value1,
            period = %payload.value2,
            comments = %payload.value3,
            "Lending request (no webhook configured)"
        );
        Ok(())
    }
}
