//! Feature sync handler trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use satchel_common::{Result, SiteId};

use crate::coordinator::DEFAULT_SYNC_INTERVAL;

/// Conventional outcome of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    /// Whether any data was sent to or received from the server.
    pub updated: bool,
    /// Non-fatal problems encountered during the run.
    pub warnings: Vec<String>,
}

impl SyncResult {
    /// A run that changed nothing and produced no warnings.
    pub fn unchanged() -> Self {
        Self::default()
    }
}

/// A feature module's entry point for scheduled synchronization.
///
/// Implementations own their sync algorithm (uploading queued offline edits,
/// reconciling conflicts) and use a [`crate::SyncCoordinator`] internally for
/// bookkeeping. The scheduler invokes `execute` at most once per `interval`,
/// and only while online if `uses_network` is true.
#[async_trait]
pub trait SyncHandler: Send + Sync {
    /// Unique handler name, e.g. "glossary".
    fn name(&self) -> &str;

    /// Run one synchronization pass against the given site.
    async fn execute(&self, site: &SiteId) -> Result<SyncResult>;

    /// Minimum time between two scheduled runs.
    fn interval(&self) -> Duration {
        DEFAULT_SYNC_INTERVAL
    }

    /// Whether runs require network connectivity.
    fn uses_network(&self) -> bool {
        true
    }
}
