//! Sync store trait definition and record types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use satchel_common::{Result, SyncId};

/// Last-sync timestamp for one `(component, id)` pair.
///
/// Overwritten wholesale every time a sync for that pair is recorded as
/// finished; `time` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Namespace of the feature module that owns the entry.
    pub component: String,
    /// Entity the sync applies to.
    pub id: SyncId,
    /// When the last sync run finished, in ms since epoch.
    pub time: i64,
}

/// Non-fatal warnings produced by the last sync attempt for a pair, kept for
/// later display. Overwritten wholesale on each update; no append semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWarningsRecord {
    /// Namespace of the feature module that owns the entry.
    pub component: String,
    /// Entity the warnings apply to.
    pub id: SyncId,
    /// Warning messages from the last attempt.
    pub warnings: Vec<String>,
}

/// Per-site persistent store for sync bookkeeping.
///
/// Records are keyed by the composite `(component, id)` pair. A missing
/// record is reported as `Ok(None)`, never as an error; only unexpected
/// store failures propagate.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Get the store backend name (e.g., "sqlite", "memory").
    fn name(&self) -> &str;

    /// Read the sync-time record for a pair.
    async fn sync_record(&self, component: &str, id: &SyncId) -> Result<Option<SyncRecord>>;

    /// Insert or overwrite a sync-time record.
    async fn upsert_sync_record(&self, record: &SyncRecord) -> Result<()>;

    /// Read the warnings record for a pair.
    async fn warnings_record(
        &self,
        component: &str,
        id: &SyncId,
    ) -> Result<Option<SyncWarningsRecord>>;

    /// Insert or overwrite a warnings record.
    async fn upsert_warnings_record(&self, record: &SyncWarningsRecord) -> Result<()>;

    /// Remove every record in the store (site wipe).
    async fn clear(&self) -> Result<()>;
}
