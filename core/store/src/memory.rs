//! In-memory sync store for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use satchel_common::{Result, SyncId};

use crate::store::{SyncRecord, SyncStore, SyncWarningsRecord};

type PairKey = (String, SyncId);

/// In-memory sync store.
///
/// Useful for testing and development. All records are stored in memory and
/// lost on drop.
pub struct MemorySyncStore {
    times: RwLock<HashMap<PairKey, SyncRecord>>,
    warnings: RwLock<HashMap<PairKey, SyncWarningsRecord>>,
}

impl MemorySyncStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            times: RwLock::new(HashMap::new()),
            warnings: RwLock::new(HashMap::new()),
        }
    }

    fn pair_key(component: &str, id: &SyncId) -> PairKey {
        (component.to_string(), id.clone())
    }
}

impl Default for MemorySyncStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncStore for MemorySyncStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn sync_record(&self, component: &str, id: &SyncId) -> Result<Option<SyncRecord>> {
        let times = self.times.read().unwrap();
        Ok(times.get(&Self::pair_key(component, id)).cloned())
    }

    async fn upsert_sync_record(&self, record: &SyncRecord) -> Result<()> {
        let key = Self::pair_key(&record.component, &record.id);
        self.times.write().unwrap().insert(key, record.clone());
        Ok(())
    }

    async fn warnings_record(
        &self,
        component: &str,
        id: &SyncId,
    ) -> Result<Option<SyncWarningsRecord>> {
        let warnings = self.warnings.read().unwrap();
        Ok(warnings.get(&Self::pair_key(component, id)).cloned())
    }

    async fn upsert_warnings_record(&self, record: &SyncWarningsRecord) -> Result<()> {
        let key = Self::pair_key(&record.component, &record.id);
        self.warnings.write().unwrap().insert(key, record.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.times.write().unwrap().clear();
        self.warnings.write().unwrap().clear();
        Ok(())
    }
}
