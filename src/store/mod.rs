//! Configuration store access: a read-only enumeration of enabled inputs
//! plus the single write-back path for snapshot results (§6).
//!
//! The CRUD side of this table belongs to the external configuration REST
//! API (out of scope, §1); the core only ever reads the enabled subset and
//! writes one column pair back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::errors::ConfigStoreError;
use crate::models::InputSource;

#[async_trait]
pub trait InputStore: Send + Sync {
    /// Enumerate currently-enabled inputs. An empty result is not an error;
    /// the scheduler treats it as "nothing to do this cycle".
    async fn enumerate_enabled(&self) -> Result<Vec<InputSource>, ConfigStoreError>;

    /// Record a successful snapshot for one input.
    async fn record_snapshot(
        &self,
        input_id: Uuid,
        path: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ConfigStoreError>;
}

/// `sqlx`-backed implementation against a SQLite `input_sources` table.
#[derive(Clone)]
pub struct SqliteInputStore {
    pool: SqlitePool,
}

impl SqliteInputStore {
    pub async fn connect(database_url: &str) -> Result<Self, ConfigStoreError> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| ConfigStoreError::EnumerationFailed(e.to_string()))?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), ConfigStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS input_sources (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                url TEXT NOT NULL,
                kind TEXT NOT NULL,
                port INTEGER,
                channel_ref TEXT,
                probe_ref TEXT,
                is_primary BOOLEAN NOT NULL DEFAULT 1,
                enabled BOOLEAN NOT NULL DEFAULT 1,
                snapshot_path TEXT,
                last_snapshot_instant TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ConfigStoreError::EnumerationFailed(e.to_string()))?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl InputStore for SqliteInputStore {
    async fn enumerate_enabled(&self) -> Result<Vec<InputSource>, ConfigStoreError> {
        sqlx::query_as::<_, InputSource>(
            "SELECT id, name, url, kind, port, channel_ref, probe_ref, is_primary, enabled,
                    snapshot_path, last_snapshot_instant
             FROM input_sources WHERE enabled = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ConfigStoreError::EnumerationFailed(e.to_string()))
    }

    async fn record_snapshot(
        &self,
        input_id: Uuid,
        path: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ConfigStoreError> {
        sqlx::query(
            "UPDATE input_sources SET snapshot_path = ?, last_snapshot_instant = ? WHERE id = ?",
        )
        .bind(path)
        .bind(at.to_rfc3339())
        .bind(input_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| ConfigStoreError::SnapshotWriteFailed {
            input_id,
            message: e.to_string(),
        })?;
        Ok(())
    }
}
