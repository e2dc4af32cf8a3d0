//! Device operations behind the inventory API

use super::model::{now_rfc3339, required, Device, DeviceEdit, NewDevice};
use super::policy::{forbidden_field, BulkField, DeviceField};
use super::store::{DeviceStore, DeviceStoreError};
use crate::auth::Role;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Invalid request: {0}")]
    Invalid(String),
    #[error("Role may not change field '{0}'")]
    Forbidden(DeviceField),
    #[error(transparent)]
    Store(#[from] DeviceStoreError),
}

pub type DeviceResult<T> = Result<T, DeviceError>;

#[derive(Clone)]
pub struct DeviceService {
    store: Arc<dyn DeviceStore>,
}

impl DeviceService {
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DeviceStore> {
        &self.store
    }

    /// All devices, sorted by lower-cased description
    pub async fn list_sorted(&self) -> DeviceResult<Vec<Device>> {
        let mut devices = self.store.list().await?;
        devices.sort_by_cached_key(|d| d.description.to_lowercase());
        Ok(devices)
    }

    pub async fn add(&self, device: NewDevice) -> DeviceResult<Device> {
        let draft = device.into_draft().map_err(DeviceError::Invalid)?;
        let device = self.store.insert(draft).await?;
        info!("Added device {} ({})", device.id, device.description);
        Ok(device)
    }

    /// Apply an edit on behalf of `role`.
    ///
    /// Only fields whose value actually differs from the stored document count
    /// as changed, so a dialog that echoes back the full device is fine for a
    /// member as long as the restricted values are untouched.
    pub async fn edit(&self, role: Role, edit: DeviceEdit) -> DeviceResult<Device> {
        let id = required(edit.id.clone(), "id").map_err(DeviceError::Invalid)?;
        required(edit.location.clone(), "location").map_err(DeviceError::Invalid)?;
        required(edit.description.clone(), "description").map_err(DeviceError::Invalid)?;

        let current = self.store.get(&id).await?;
        let (updated, changed) = apply_edit(&current, edit);

        if let Some(field) = forbidden_field(role, &changed) {
            warn!("Role {} tried to change '{}' on device {}", role, field, id);
            return Err(DeviceError::Forbidden(field));
        }

        if changed.is_empty() {
            debug!("Edit of device {} changed nothing", id);
            return Ok(current);
        }

        self.store.update(&updated).await?;
        debug!("Edited device {}: {:?}", id, changed);
        Ok(updated)
    }

    /// Set `field` to `value` on each device, stopping at the first failure
    pub async fn bulk_edit(&self, ids: &[String], field: BulkField, value: &str) -> DeviceResult<usize> {
        if ids.is_empty() {
            return Err(DeviceError::Invalid("ids must not be empty".to_string()));
        }
        if value.trim().is_empty() {
            return Err(DeviceError::Invalid(format!("{} must not be empty", field.column())));
        }

        for id in ids {
            self.store.set_field(id, field, value).await?;
        }
        info!("Bulk edited {} on {} devices", field.column(), ids.len());
        Ok(ids.len())
    }
}

fn apply_edit(current: &Device, edit: DeviceEdit) -> (Device, Vec<DeviceField>) {
    let mut updated = current.clone();
    let mut changed = Vec::new();

    macro_rules! merge {
        ($field:ident, $kind:expr) => {
            if let Some(value) = edit.$field {
                if updated.$field != value {
                    updated.$field = value;
                    changed.push($kind);
                }
            }
        };
    }

    merge!(brand, DeviceField::Brand);
    merge!(buy_date, DeviceField::BuyDate);
    merge!(category, DeviceField::Category);
    merge!(comments, DeviceField::Comments);
    merge!(container, DeviceField::Container);
    merge!(description, DeviceField::Description);
    merge!(location, DeviceField::Location);
    merge!(location_prec, DeviceField::LocationPrec);
    merge!(status, DeviceField::Status);
    merge!(store, DeviceField::Store);

    if let Some(amount) = edit.amount {
        let amount = amount.clamp(1, u32::MAX as i64) as u32;
        if updated.amount != amount {
            updated.amount = amount;
            changed.push(DeviceField::Amount);
        }
    }
    if let Some(price) = edit.price {
        if updated.price != price {
            updated.price = price;
            changed.push(DeviceField::Price);
        }
    }

    if !changed.is_empty() {
        updated.last_edit = now_rfc3339();
    }
    (updated, changed)
}
