//! SQLite-backed device store

use super::model::{now_rfc3339, Device, DeviceDraft};
use super::policy::BulkField;
use super::store::{DeviceStore, DeviceStoreError, DeviceStoreResult};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

const DEVICE_COLUMNS: &str = "id, amount, brand, buy_date, category, comments, container, \
     description, location, location_prec, price, status, store, last_edit";

pub struct SqliteDeviceStore {
    pool: SqlitePool,
}

impl SqliteDeviceStore {
    /// Connect and make sure the `devices` table exists
    pub async fn connect(database_url: &str) -> DeviceStoreResult<Self> {
        info!("Connecting device store: {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to `:memory:` opens its own database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_tables(&self) -> DeviceStoreResult<()> {
        debug!("Creating devices table");
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS devices (
                id TEXT PRIMARY KEY,
                amount INTEGER NOT NULL DEFAULT 1,
                brand TEXT NOT NULL DEFAULT '',
                buy_date TEXT NOT NULL DEFAULT '',
                category TEXT NOT NULL DEFAULT '',
                comments TEXT NOT NULL DEFAULT '',
                container TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL,
                location TEXT NOT NULL,
                location_prec TEXT NOT NULL DEFAULT '',
                price REAL NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'not_on_loan',
                store TEXT NOT NULL DEFAULT '',
                last_edit TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_device(row: &SqliteRow) -> DeviceStoreResult<Device> {
        let status: String = row.try_get("status")?;
        let amount: i64 = row.try_get("amount")?;

        Ok(Device {
            id: row.try_get("id")?,
            amount: amount.clamp(1, u32::MAX as i64) as u32,
            brand: row.try_get("brand")?,
            buy_date: row.try_get("buy_date")?,
            category: row.try_get("category")?,
            comments: row.try_get("comments")?,
            container: row.try_get("container")?,
            description: row.try_get("description")?,
            location: row.try_get("location")?,
            location_prec: row.try_get("location_prec")?,
            price: row.try_get("price")?,
            status: status.parse().map_err(DeviceStoreError::Backend)?,
            store: row.try_get("store")?,
            last_edit: row.try_get("last_edit")?,
        })
    }
}

#[async_trait]
impl DeviceStore for SqliteDeviceStore {
    async fn list(&self) -> DeviceStoreResult<Vec<Device>> {
        let rows = sqlx::query(&format!("SELECT {} FROM devices", DEVICE_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_device).collect()
    }

    async fn get(&self, id: &str) -> DeviceStoreResult<Device> {
        let row = sqlx::query(&format!("SELECT {} FROM devices WHERE id = ?", DEVICE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DeviceStoreError::NotFound(id.to_string()))?;
        Self::row_to_device(&row)
    }

    async fn insert(&self, draft: DeviceDraft) -> DeviceStoreResult<Device> {
        let device = Device::from_draft(Uuid::new_v4().simple().to_string(), draft);

        sqlx::query(&format!(
            "INSERT INTO devices ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            DEVICE_COLUMNS
        ))
        .bind(&device.id)
        .bind(device.amount as i64)
        .bind(&device.brand)
        .bind(&device.buy_date)
        .bind(&device.category)
        .bind(&device.comments)
        .bind(&device.container)
        .bind(&device.description)
        .bind(&device.location)
        .bind(&device.location_prec)
        .bind(device.price)
        .bind(device.status.as_str())
        .bind(&device.store)
        .bind(&device.last_edit)
        .execute(&self.pool)
        .await?;

        Ok(device)
    }

    async fn update(&self, device: &Device) -> DeviceStoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE devices SET
                amount = ?, brand = ?, buy_date = ?, category = ?, comments = ?,
                container = ?, description = ?, location = ?, location_prec = ?,
                price = ?, status = ?, store = ?, last_edit = ?
            WHERE id = ?
            "#,
        )
        .bind(device.amount as i64)
        .bind(&device.brand)
        .bind(&device.buy_date)
        .bind(&device.category)
        .bind(&device.comments)
        .bind(&device.container)
        .bind(&device.description)
        .bind(&device.location)
        .bind(&device.location_prec)
        .bind(device.price)
        .bind(device.status.as_str())
        .bind(&device.store)
        .bind(&device.last_edit)
        .bind(&device.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DeviceStoreError::NotFound(device.id.clone()));
        }
        Ok(())
    }

    async fn set_field(&self, id: &str, field: BulkField, value: &str) -> DeviceStoreResult<()> {
        // Column names come from a closed enum, never from the request.
        let sql = format!(
            "UPDATE devices SET {} = ?, last_edit = ? WHERE id = ?",
            field.column()
        );
        let result = sqlx::query(&sql)
            .bind(value)
            .bind(now_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DeviceStoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
