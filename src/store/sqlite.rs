//! SQLite configuration store backend
//!
//! Reads the fleet configuration (device types, devices, parameters,
//! thresholds) from a local SQLite database file. The schema lives in
//! `migrations/` and is applied automatically on startup, so a fresh
//! file becomes a valid, empty fleet. Rows are edited out-of-band;
//! this backend only ever reads.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument};

use super::backend::ConfigStore;
use super::error::{StoreError, StoreResult};
use super::schema::{Device, Parameter, Threshold};

/// SQLite-backed `ConfigStore`.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open the database file (creating it if missing) and run
    /// migrations.
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("opening configuration store at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        debug!("running configuration store migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    fn device_from_row(row: &sqlx::sqlite::SqliteRow) -> Device {
        Device {
            id: row.get("id"),
            name: row.get("name"),
            host: row.get("host"),
            port: row.get::<i64, _>("port") as u16,
            description: row.get("description"),
            enabled: row.get("enabled"),
            device_type_id: row.get("device_type_id"),
        }
    }
}

#[async_trait]
impl ConfigStore for SqliteStore {
    #[instrument(skip(self))]
    async fn list_enabled_devices(&self) -> StoreResult<Vec<Device>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, host, port, description, enabled, device_type_id
            FROM device
            WHERE enabled = 1
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let devices: Vec<Device> = rows.iter().map(Self::device_from_row).collect();
        debug!("loaded {} enabled devices", devices.len());
        Ok(devices)
    }

    #[instrument(skip(self))]
    async fn list_parameters_by_device_type(
        &self,
        device_type_id: i64,
    ) -> StoreResult<Vec<Parameter>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, command, unit, description, device_type_id
            FROM parameter
            WHERE device_type_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(device_type_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let parameters = rows
            .into_iter()
            .map(|row| Parameter {
                id: row.get("id"),
                name: row.get("name"),
                command: row.get("command"),
                unit: row.get("unit"),
                description: row.get("description"),
                device_type_id: row.get("device_type_id"),
            })
            .collect();

        Ok(parameters)
    }

    #[instrument(skip(self))]
    async fn list_active_thresholds_by_device(&self, device_id: i64) -> StoreResult<Vec<Threshold>> {
        let rows = sqlx::query(
            r#"
            SELECT id, low, high, enabled, parameter_id, device_id
            FROM threshold
            WHERE device_id = ? AND enabled = 1
            ORDER BY id ASC
            "#,
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let thresholds = rows
            .into_iter()
            .map(|row| Threshold {
                id: row.get("id"),
                low: row.get("low"),
                high: row.get("high"),
                enabled: row.get("enabled"),
                parameter_id: row.get("parameter_id"),
                device_id: row.get("device_id"),
            })
            .collect();

        Ok(thresholds)
    }
}
