//! Equipment inventory: device documents, storage backends and the edit rules
//! applied by the device API.

pub mod model;
pub mod policy;
pub mod service;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod store;

pub use model::{Device, DeviceDraft, DeviceEdit, DeviceStatus, NewDevice};
pub use policy::{forbidden_field, BulkField, DeviceField};
pub use service::{DeviceError, DeviceService};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDeviceStore;
pub use store::{DeviceStore, DeviceStoreError, DeviceStoreResult, MemoryDeviceStore};
