//! SQLite-backed sync store.
//!
//! Persists sync times and warnings so bookkeeping survives restarts.

use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use satchel_common::{Error, Result, SyncId};

use crate::store::{SyncRecord, SyncStore, SyncWarningsRecord};

/// Durable sync store using SQLite.
///
/// One database file per site; the connection is serialized behind a mutex.
pub struct SqliteSyncStore {
    conn: Mutex<Connection>,
}

impl SqliteSyncStore {
    /// Create or open a sync database.
    ///
    /// # Errors
    /// - Database creation or migration failure
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;

        // Initialize schema
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sync_times (
                component TEXT NOT NULL,
                id TEXT NOT NULL,
                time INTEGER NOT NULL,
                PRIMARY KEY (component, id)
            );

            CREATE TABLE IF NOT EXISTS sync_warnings (
                component TEXT NOT NULL,
                id TEXT NOT NULL,
                warnings TEXT NOT NULL,
                PRIMARY KEY (component, id)
            );
            "#,
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        info!("Sync store opened successfully");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }
}

#[async_trait]
impl SyncStore for SqliteSyncStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn sync_record(&self, component: &str, id: &SyncId) -> Result<Option<SyncRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT time FROM sync_times WHERE component = ?1 AND id = ?2")
            .map_err(|e| Error::Database(e.to_string()))?;

        match stmt.query_row(params![component, id.as_str()], |row| row.get::<_, i64>(0)) {
            Ok(time) => Ok(Some(SyncRecord {
                component: component.to_string(),
                id: id.clone(),
                time,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::Database(e.to_string())),
        }
    }

    async fn upsert_sync_record(&self, record: &SyncRecord) -> Result<()> {
        debug!("Upserting sync time: {}#{}", record.component, record.id);
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT OR REPLACE INTO sync_times (component, id, time)
            VALUES (?1, ?2, ?3)
            "#,
            params![record.component, record.id.as_str(), record.time],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn warnings_record(
        &self,
        component: &str,
        id: &SyncId,
    ) -> Result<Option<SyncWarningsRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT warnings FROM sync_warnings WHERE component = ?1 AND id = ?2")
            .map_err(|e| Error::Database(e.to_string()))?;

        let json: Option<String> =
            match stmt.query_row(params![component, id.as_str()], |row| row.get(0)) {
                Ok(v) => Some(v),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(Error::Database(e.to_string())),
            };

        match json {
            Some(json) => {
                let warnings: Vec<String> = serde_json::from_str(&json)
                    .map_err(|e| Error::Serialization(e.to_string()))?;
                Ok(Some(SyncWarningsRecord {
                    component: component.to_string(),
                    id: id.clone(),
                    warnings,
                }))
            }
            None => Ok(None),
        }
    }

    async fn upsert_warnings_record(&self, record: &SyncWarningsRecord) -> Result<()> {
        debug!("Upserting warnings: {}#{}", record.component, record.id);
        let json = serde_json::to_string(&record.warnings)
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT OR REPLACE INTO sync_warnings (component, id, warnings)
            VALUES (?1, ?2, ?3)
            "#,
            params![record.component, record.id.as_str(), json],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        info!("Clearing sync store");
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM sync_times", [])
            .map_err(|e| Error::Database(e.to_string()))?;
        conn.execute("DELETE FROM sync_warnings", [])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }
}
