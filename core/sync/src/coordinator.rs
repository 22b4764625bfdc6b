//! Generic per-component sync bookkeeping.
//!
//! Feature modules get "don't sync the same entity twice concurrently" plus
//! "remember when each entity last synced" plus "remember what went wrong
//! last time" without re-implementing the logic.

use chrono::Utc;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use satchel_common::{Result, SiteId, SyncId};
use satchel_store::{SiteRegistry, SyncRecord, SyncWarningsRecord};

use crate::handler::SyncResult;

/// Minimum time between two automatic syncs of the same entity.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(300);

/// Handle to an in-flight sync. Awaitable by any number of callers; each
/// receives the sync's actual outcome, including its error.
pub type SharedSync<T> = Shared<BoxFuture<'static, Result<T>>>;

type OngoingKey = (SiteId, String, SyncId);
type OngoingMap<T> = Arc<Mutex<HashMap<OngoingKey, SharedSync<T>>>>;

/// Sync bookkeeping coordinator for one component namespace.
///
/// Persistent state (sync times and warnings) lives in the per-site store
/// resolved through the registry; the ongoing-sync map is in-memory only and
/// shared with every child coordinator. `T` is the sync outcome type the
/// owning feature module produces.
#[derive(Clone)]
pub struct SyncCoordinator<T = SyncResult>
where
    T: Clone + Send + Sync + 'static,
{
    component: String,
    sync_interval: Duration,
    sites: Arc<SiteRegistry>,
    ongoing: OngoingMap<T>,
}

impl<T> SyncCoordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a coordinator for a component namespace.
    pub fn new(component: impl Into<String>, sites: Arc<SiteRegistry>) -> Self {
        Self {
            component: component.into(),
            sync_interval: DEFAULT_SYNC_INTERVAL,
            sites,
            ongoing: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Set the sync interval.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Create a coordinator bound to a different component namespace.
    ///
    /// The child shares the site registry and the ongoing-sync map with its
    /// parent; persistent records stay isolated because every key carries the
    /// component.
    pub fn create_child(&self, component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            sync_interval: self.sync_interval,
            sites: self.sites.clone(),
            ongoing: self.ongoing.clone(),
        }
    }

    /// The component namespace this coordinator is bound to.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// The configured sync interval.
    pub fn sync_interval(&self) -> Duration {
        self.sync_interval
    }

    /// When the entity last finished a sync, in ms since epoch.
    ///
    /// Returns `0` if the entity has never synced.
    ///
    /// # Errors
    /// - Site cannot be resolved or store read fails
    pub async fn sync_time(&self, id: impl Into<SyncId>, site: Option<&SiteId>) -> Result<i64> {
        let store = self.sites.store(site)?;
        let record = store.sync_record(&self.component, &id.into()).await?;
        Ok(record.map(|r| r.time).unwrap_or(0))
    }

    /// Record when the entity last finished a sync.
    ///
    /// `time` defaults to now. Overwrites any previous value.
    ///
    /// # Errors
    /// - Site cannot be resolved or store write fails
    pub async fn set_sync_time(
        &self,
        id: impl Into<SyncId>,
        site: Option<&SiteId>,
        time: Option<i64>,
    ) -> Result<()> {
        let store = self.sites.store(site)?;
        let record = SyncRecord {
            component: self.component.clone(),
            id: id.into(),
            time: time.unwrap_or_else(now_ms),
        };
        store.upsert_sync_record(&record).await
    }

    /// Whether the sync interval has elapsed since the entity's last sync.
    ///
    /// A never-synced entity always needs a sync.
    ///
    /// # Errors
    /// - Site cannot be resolved or store read fails
    pub async fn is_sync_needed(
        &self,
        id: impl Into<SyncId>,
        site: Option<&SiteId>,
    ) -> Result<bool> {
        let time = self.sync_time(id, site).await?;
        Ok(needs_sync(time, now_ms(), self.sync_interval))
    }

    /// Synchronous check: is a sync currently registered for the entity?
    ///
    /// `false` when the site cannot be resolved.
    pub fn is_syncing(&self, id: impl Into<SyncId>, site: Option<&SiteId>) -> bool {
        self.ongoing_sync(id, site).is_some()
    }

    /// The live handle of the ongoing sync for the entity, if any.
    ///
    /// Awaiting the handle yields the sync's actual outcome, including its
    /// error.
    pub fn ongoing_sync(
        &self,
        id: impl Into<SyncId>,
        site: Option<&SiteId>,
    ) -> Option<SharedSync<T>> {
        let site = self.sites.resolve(site).ok()?;
        let key = (site, self.component.clone(), id.into());
        self.ongoing.lock().unwrap().get(&key).cloned()
    }

    /// Wait until any ongoing sync for the entity settles.
    ///
    /// Returns immediately when none is registered. A failure of the awaited
    /// sync is not surfaced; only settlement matters here.
    pub async fn wait_for_sync(&self, id: impl Into<SyncId>, site: Option<&SiteId>) {
        if let Some(handle) = self.ongoing_sync(id, site) {
            let _ = handle.await;
        }
    }

    /// Register `sync` as the ongoing sync for the entity, drive it to
    /// completion, and return its outcome.
    ///
    /// The registration is observable through `is_syncing`, `wait_for_sync`
    /// and `ongoing_sync` until `sync` settles, and is removed on settlement
    /// regardless of outcome. A second registration for the same key replaces
    /// the first (last registration wins); callers check `is_syncing` or
    /// `ongoing_sync` first and chain onto the existing handle instead of
    /// double-registering.
    ///
    /// # Errors
    /// - Site cannot be resolved
    /// - Whatever `sync` itself fails with
    pub async fn add_ongoing_sync<F>(
        &self,
        id: impl Into<SyncId>,
        sync: F,
        site: Option<&SiteId>,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let site = self.sites.resolve(site)?;
        let id = id.into();
        let key = (site.clone(), self.component.clone(), id.clone());

        debug!("Sync started: {}#{} on site {}", self.component, id, site);
        let handle: SharedSync<T> = sync.boxed().shared();
        self.ongoing
            .lock()
            .unwrap()
            .insert(key.clone(), handle.clone());

        let result = handle.await;

        self.ongoing.lock().unwrap().remove(&key);
        debug!("Sync settled: {}#{} on site {}", self.component, id, site);

        result
    }

    /// Warnings produced by the entity's last sync attempt.
    ///
    /// Returns `[]` if none were recorded.
    ///
    /// # Errors
    /// - Site cannot be resolved or store read fails
    pub async fn sync_warnings(
        &self,
        id: impl Into<SyncId>,
        site: Option<&SiteId>,
    ) -> Result<Vec<String>> {
        let store = self.sites.store(site)?;
        let record = store.warnings_record(&self.component, &id.into()).await?;
        Ok(record.map(|r| r.warnings).unwrap_or_default())
    }

    /// Overwrite the stored warnings for the entity.
    ///
    /// # Errors
    /// - Site cannot be resolved or store write fails
    pub async fn set_sync_warnings(
        &self,
        id: impl Into<SyncId>,
        warnings: Vec<String>,
        site: Option<&SiteId>,
    ) -> Result<()> {
        let store = self.sites.store(site)?;
        let record = SyncWarningsRecord {
            component: self.component.clone(),
            id: id.into(),
            warnings,
        };
        store.upsert_warnings_record(&record).await
    }
}

/// Current wall-clock time in ms since epoch.
pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A sync is needed once `interval` has elapsed since `stored`.
fn needs_sync(stored: i64, now: i64, interval: Duration) -> bool {
    now - interval.as_millis() as i64 >= stored
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_common::Error;
    use satchel_store::MemorySyncStore;
    use tokio::sync::oneshot;

    fn site(id: &str) -> SiteId {
        SiteId::new(id).unwrap()
    }

    fn setup() -> SyncCoordinator<i32> {
        let registry = Arc::new(SiteRegistry::new());
        registry
            .register_site(site("site1"), Arc::new(MemorySyncStore::new()))
            .unwrap();
        registry
            .register_site(site("site2"), Arc::new(MemorySyncStore::new()))
            .unwrap();
        registry.set_current_site(Some(site("site1"))).unwrap();
        SyncCoordinator::new("glossary", registry)
    }

    #[test]
    fn test_needs_sync_boundaries() {
        let interval = Duration::from_millis(300_000);

        // Never synced.
        assert!(needs_sync(0, 1, interval));
        // One ms short of the interval.
        assert!(!needs_sync(1000, 1000 + 299_999, interval));
        // Exactly the interval.
        assert!(needs_sync(1000, 1000 + 300_000, interval));
        // Past the interval.
        assert!(needs_sync(1000, 1000 + 300_001, interval));
    }

    #[tokio::test]
    async fn test_sync_time_defaults_to_zero() {
        let coord = setup();
        assert_eq!(coord.sync_time(42i64, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_and_read_sync_time() {
        let coord = setup();
        coord
            .set_sync_time(42i64, Some(&site("site1")), Some(1000))
            .await
            .unwrap();
        assert_eq!(
            coord.sync_time(42i64, Some(&site("site1"))).await.unwrap(),
            1000
        );
    }

    #[tokio::test]
    async fn test_is_sync_needed_follows_recorded_time() {
        let coord = setup();

        // Never synced.
        assert!(coord.is_sync_needed(42i64, None).await.unwrap());

        // Just synced.
        coord.set_sync_time(42i64, None, None).await.unwrap();
        assert!(!coord.is_sync_needed(42i64, None).await.unwrap());

        // Synced longer ago than the interval.
        let stale = now_ms() - DEFAULT_SYNC_INTERVAL.as_millis() as i64 - 1000;
        coord.set_sync_time(42i64, None, Some(stale)).await.unwrap();
        assert!(coord.is_sync_needed(42i64, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_sync_times_scoped_per_site() {
        let coord = setup();
        coord
            .set_sync_time(42i64, Some(&site("site1")), Some(1000))
            .await
            .unwrap();

        assert_eq!(
            coord.sync_time(42i64, Some(&site("site2"))).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_ongoing_sync_lifecycle() {
        let coord = setup();
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        assert!(!coord.is_syncing(7i64, None));

        let runner = coord.clone();
        let task = tokio::spawn(async move {
            runner
                .add_ongoing_sync(
                    7i64,
                    async move {
                        started_tx.send(()).ok();
                        release_rx.await.ok();
                        Ok(5)
                    },
                    None,
                )
                .await
        });

        started_rx.await.unwrap();
        assert!(coord.is_syncing(7i64, None));

        // The live handle observes the actual outcome.
        let handle = coord.ongoing_sync(7i64, None).unwrap();
        release_tx.send(()).unwrap();
        assert_eq!(handle.await.unwrap(), 5);

        assert_eq!(task.await.unwrap().unwrap(), 5);
        assert!(!coord.is_syncing(7i64, None));
        assert!(coord.ongoing_sync(7i64, None).is_none());
    }

    #[tokio::test]
    async fn test_wait_for_sync_returns_immediately_when_idle() {
        let coord = setup();
        coord.wait_for_sync(7i64, None).await;
    }

    #[tokio::test]
    async fn test_wait_for_sync_survives_failed_sync() {
        let coord = setup();
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let runner = coord.clone();
        let task = tokio::spawn(async move {
            runner
                .add_ongoing_sync(
                    7i64,
                    async move {
                        started_tx.send(()).ok();
                        release_rx.await.ok();
                        Err(Error::Storage("upload failed".to_string()))
                    },
                    None,
                )
                .await
        });

        started_rx.await.unwrap();
        let waiter = coord.clone();
        let wait_task = tokio::spawn(async move { waiter.wait_for_sync(7i64, None).await });

        release_tx.send(()).unwrap();
        // Completes normally even though the sync failed.
        wait_task.await.unwrap();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(Error::Storage(_))));
        assert!(!coord.is_syncing(7i64, None));
    }

    #[tokio::test]
    async fn test_children_keep_independent_state() {
        let glossary = setup();
        let quiz = glossary.create_child("quiz");

        glossary
            .set_sync_time(42i64, None, Some(1000))
            .await
            .unwrap();
        quiz.set_sync_time(42i64, None, Some(2000)).await.unwrap();

        assert_eq!(glossary.sync_time(42i64, None).await.unwrap(), 1000);
        assert_eq!(quiz.sync_time(42i64, None).await.unwrap(), 2000);

        glossary
            .set_sync_warnings(42i64, vec!["w1".to_string()], None)
            .await
            .unwrap();
        assert!(quiz.sync_warnings(42i64, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_child_ongoing_syncs_do_not_collide() {
        let glossary = setup();
        let quiz = glossary.create_child("quiz");
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let runner = glossary.clone();
        let task = tokio::spawn(async move {
            runner
                .add_ongoing_sync(
                    42i64,
                    async move {
                        started_tx.send(()).ok();
                        release_rx.await.ok();
                        Ok(1)
                    },
                    None,
                )
                .await
        });

        started_rx.await.unwrap();
        assert!(glossary.is_syncing(42i64, None));
        assert!(!quiz.is_syncing(42i64, None));

        release_tx.send(()).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_warnings_roundtrip_and_overwrite() {
        let coord = setup();

        assert!(coord.sync_warnings(7i64, None).await.unwrap().is_empty());

        coord
            .set_sync_warnings(7i64, vec!["w1".to_string()], None)
            .await
            .unwrap();
        assert_eq!(
            coord.sync_warnings(7i64, None).await.unwrap(),
            vec!["w1".to_string()]
        );

        coord.set_sync_warnings(7i64, vec![], None).await.unwrap();
        assert!(coord.sync_warnings(7i64, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_site_reads_fail_but_is_syncing_is_false() {
        let registry = Arc::new(SiteRegistry::new());
        let coord: SyncCoordinator<i32> = SyncCoordinator::new("glossary", registry);

        assert!(coord.sync_time(1i64, None).await.is_err());
        assert!(!coord.is_syncing(1i64, None));
    }
}
