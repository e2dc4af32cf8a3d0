//! Inventory documents as stored and as submitted by the dialogs

use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    OnLoan,
    #[default]
    NotOnLoan,
    Broken,
    Lost,
}

impl DeviceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceStatus::OnLoan => "on_loan",
            DeviceStatus::NotOnLoan => "not_on_loan",
            DeviceStatus::Broken => "broken",
            DeviceStatus::Lost => "lost",
        }
    }
}

impl std::str::FromStr for DeviceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_loan" => Ok(DeviceStatus::OnLoan),
            "not_on_loan" => Ok(DeviceStatus::NotOnLoan),
            "broken" => Ok(DeviceStatus::Broken),
            "lost" => Ok(DeviceStatus::Lost),
            _ => Err(format!("Unknown device status: {}", s)),
        }
    }
}

/// A stored device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub amount: u32,
    pub brand: String,
    #[serde(rename = "buyDate")]
    pub buy_date: String,
    pub category: String,
    pub comments: String,
    pub container: String,
    pub description: String,
    pub location: String,
    pub location_prec: String,
    pub price: f64,
    pub status: DeviceStatus,
    pub store: String,
    #[serde(rename = "lastEdit")]
    pub last_edit: String,
}

impl Device {
    pub fn from_draft(id: String, draft: DeviceDraft) -> Self {
        Self {
            id,
            amount: draft.amount,
            brand: draft.brand,
            buy_date: draft.buy_date,
            category: draft.category,
            comments: draft.comments,
            container: draft.container,
            description: draft.description,
            location: draft.location,
            location_prec: draft.location_prec,
            price: draft.price,
            status: DeviceStatus::NotOnLoan,
            store: draft.store,
            last_edit: now_rfc3339(),
        }
    }
}

/// Body of `POST /api/devices/add`. Everything is optional on the wire so that a
/// missing field is a validation failure rather than a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewDevice {
    pub amount: Option<i64>,
    pub brand: Option<String>,
    #[serde(rename = "buyDate")]
    pub buy_date: Option<String>,
    pub category: Option<String>,
    pub comments: Option<String>,
    pub container: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub location_prec: Option<String>,
    pub price: Option<f64>,
    pub store: Option<String>,
}

/// Validated new device, ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDraft {
    pub amount: u32,
    pub brand: String,
    pub buy_date: String,
    pub category: String,
    pub comments: String,
    pub container: String,
    pub description: String,
    pub location: String,
    pub location_prec: String,
    pub price: f64,
    pub store: String,
}

impl NewDevice {
    /// `location` and `description` are required; `amount` is at least 1
    pub fn into_draft(self) -> Result<DeviceDraft, String> {
        let location = required(self.location, "location")?;
        let description = required(self.description, "description")?;

        Ok(DeviceDraft {
            amount: self.amount.unwrap_or(1).clamp(1, u32::MAX as i64) as u32,
            brand: self.brand.unwrap_or_default(),
            buy_date: self.buy_date.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            comments: self.comments.unwrap_or_default(),
            container: self.container.unwrap_or_default(),
            description,
            location,
            location_prec: self.location_prec.unwrap_or_default(),
            price: self.price.unwrap_or(0.0),
            store: self.store.unwrap_or_default(),
        })
    }
}

/// Body of `POST /api/devices/edit`. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeviceEdit {
    pub id: Option<String>,
    pub amount: Option<i64>,
    pub brand: Option<String>,
    #[serde(rename = "buyDate")]
    pub buy_date: Option<String>,
    pub category: Option<String>,
    pub comments: Option<String>,
    pub container: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub location_prec: Option<String>,
    pub price: Option<f64>,
    pub status: Option<DeviceStatus>,
    pub store: Option<String>,
}

pub(crate) fn required(value: Option<String>, field: &str) -> Result<String, String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(format!("{} is required", field)),
    }
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
