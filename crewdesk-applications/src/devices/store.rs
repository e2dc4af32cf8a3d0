//! Device storage backends

use super::model::{now_rfc3339, Device, DeviceDraft};
use super::policy::BulkField;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum DeviceStoreError {
    #[error("Device not found: {0}")]
    NotFound(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for DeviceStoreError {
    fn from(e: sqlx::Error) -> Self {
        DeviceStoreError::Backend(e.to_string())
    }
}

pub type DeviceStoreResult<T> = Result<T, DeviceStoreError>;

/// Device collection
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn list(&self) -> DeviceStoreResult<Vec<Device>>;

    async fn get(&self, id: &str) -> DeviceStoreResult<Device>;

    /// Store a new device under a fresh id
    async fn insert(&self, draft: DeviceDraft) -> DeviceStoreResult<Device>;

    /// Overwrite an existing device
    async fn update(&self, device: &Device) -> DeviceStoreResult<()>;

    /// Set a single bulk-editable field
    async fn set_field(&self, id: &str, field: BulkField, value: &str) -> DeviceStoreResult<()>;
}

/// In-memory device store
#[derive(Debug, Default)]
pub struct MemoryDeviceStore {
    devices: RwLock<HashMap<String, Device>>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn list(&self) -> DeviceStoreResult<Vec<Device>> {
        Ok(self.devices.read().await.values().cloned().collect())
    }

    async fn get(&self, id: &str) -> DeviceStoreResult<Device> {
        self.devices
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| DeviceStoreError::NotFound(id.to_string()))
    }

    async fn insert(&self, draft: DeviceDraft) -> DeviceStoreResult<Device> {
        let device = Device::from_draft(Uuid::new_v4().simple().to_string(), draft);
        self.devices
            .write()
            .await
            .insert(device.id.clone(), device.clone());
        Ok(device)
    }

    async fn update(&self, device: &Device) -> DeviceStoreResult<()> {
        let mut devices = self.devices.write().await;
        match devices.get_mut(&device.id) {
            Some(existing) => {
                *existing = device.clone();
                Ok(())
            }
            None => Err(DeviceStoreError::NotFound(device.id.clone())),
        }
    }

    async fn set_field(&self, id: &str, field: BulkField, value: &str) -> DeviceStoreResult<()> {
        let mut devices = self.devices.write().await;
        let device = devices
            .get_mut(id)
            .ok_or_else(|| DeviceStoreError::NotFound(id.to_string()))?;

        let slot = match field {
            BulkField::Location => &mut device.location,
            BulkField::LocationPrec => &mut device.location_prec,
            BulkField::Container => &mut device.container,
        };
        *slot = value.to_string();
        device.last_edit = now_rfc3339();
        Ok(())
    }
}
