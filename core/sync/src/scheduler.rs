//! Periodic sync scheduling.
//!
//! Feature handlers register with the scheduler, which runs each of them at
//! most once per handler interval against the current site, skipping handlers
//! that need the network while the device is offline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::time::{interval, Instant};
use tracing::{debug, error, info};

use satchel_common::{Error, Result, SiteId};
use satchel_store::SiteRegistry;

use crate::handler::SyncHandler;

/// How often the scheduler re-checks handler intervals.
pub const DEFAULT_CHECK_PERIOD: Duration = Duration::from_secs(30);

/// Shared online/offline flag.
///
/// The platform layer flips it on connectivity events; the scheduler reads it
/// before running handlers that use the network.
#[derive(Clone)]
pub struct NetworkStatus {
    online: Arc<AtomicBool>,
}

impl NetworkStatus {
    /// Create a flag with the given initial state.
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    /// Update the connectivity state.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Current connectivity state.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Sync request types.
#[derive(Debug)]
pub enum SyncRequest {
    /// Run every registered handler.
    All { force: bool },
    /// Run one handler by name.
    Handler { name: String, force: bool },
    /// Shutdown the scheduler.
    Shutdown,
}

/// Outcome of one scheduler pass.
#[derive(Debug, Clone)]
pub struct SyncRunSummary {
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration: Duration,
}

type SyncResponse = oneshot::Sender<Result<SyncRunSummary>>;

/// Client half of the scheduler: submits requests to the background task.
pub struct SyncScheduler {
    /// Channel to send sync requests.
    request_tx: mpsc::Sender<(SyncRequest, SyncResponse)>,
    /// Shutdown signal.
    shutdown: Arc<RwLock<bool>>,
}

impl SyncScheduler {
    /// Create a scheduler and the handle that runs its background task.
    pub fn new(sites: Arc<SiteRegistry>, network: NetworkStatus) -> (Self, SyncSchedulerHandle) {
        let (request_tx, request_rx) = mpsc::channel(100);
        let shutdown = Arc::new(RwLock::new(false));

        let scheduler = Self {
            request_tx,
            shutdown: shutdown.clone(),
        };

        let handle = SyncSchedulerHandle {
            sites,
            network,
            handlers: Vec::new(),
            check_period: DEFAULT_CHECK_PERIOD,
            request_rx: Some(request_rx),
            shutdown,
        };

        (scheduler, handle)
    }

    /// Run every handler whose interval has elapsed.
    pub async fn request_sync(&self) -> Result<SyncRunSummary> {
        self.request(SyncRequest::All { force: false }).await
    }

    /// Run every handler immediately, ignoring intervals.
    pub async fn force_sync(&self) -> Result<SyncRunSummary> {
        self.request(SyncRequest::All { force: true }).await
    }

    /// Run one handler immediately, ignoring its interval.
    pub async fn force_handler(&self, name: impl Into<String>) -> Result<SyncRunSummary> {
        self.request(SyncRequest::Handler {
            name: name.into(),
            force: true,
        })
        .await
    }

    async fn request(&self, request: SyncRequest) -> Result<SyncRunSummary> {
        let (response_tx, response_rx) = oneshot::channel();

        self.request_tx
            .send((request, response_tx))
            .await
            .map_err(|_| Error::Scheduler("Scheduler not running".to_string()))?;

        response_rx
            .await
            .map_err(|_| Error::Scheduler("Failed to receive sync summary".to_string()))?
    }

    /// Shutdown the scheduler.
    pub async fn shutdown(&self) {
        let mut is_shutdown = self.shutdown.write().await;
        *is_shutdown = true;

        // Send shutdown request
        let (response_tx, _) = oneshot::channel();
        let _ = self
            .request_tx
            .send((SyncRequest::Shutdown, response_tx))
            .await;
    }
}

/// Handle for the scheduler background task.
pub struct SyncSchedulerHandle {
    sites: Arc<SiteRegistry>,
    network: NetworkStatus,
    handlers: Vec<Arc<dyn SyncHandler>>,
    check_period: Duration,
    request_rx: Option<mpsc::Receiver<(SyncRequest, SyncResponse)>>,
    shutdown: Arc<RwLock<bool>>,
}

impl SyncSchedulerHandle {
    /// Register a feature handler. Call before `run`.
    pub fn register(&mut self, handler: Arc<dyn SyncHandler>) {
        debug!("Registered sync handler '{}'", handler.name());
        self.handlers.push(handler);
    }

    /// Set how often handler intervals are re-checked.
    pub fn with_check_period(mut self, period: Duration) -> Self {
        self.check_period = period;
        self
    }

    /// Run the scheduler background task.
    ///
    /// This should be spawned in a tokio task.
    pub async fn run(mut self) {
        let mut request_rx = self.request_rx.take().expect("Handle can only be run once");
        let mut tick = interval(self.check_period);
        // The first tick of a fresh interval completes immediately.
        tick.tick().await;

        let mut last_run: HashMap<String, Instant> = HashMap::new();

        info!("Sync scheduler started");

        loop {
            if *self.shutdown.read().await {
                break;
            }

            tokio::select! {
                Some((request, response_tx)) = request_rx.recv() => {
                    match request {
                        SyncRequest::Shutdown => {
                            info!("Received shutdown request");
                            break;
                        }
                        SyncRequest::All { force } => {
                            debug!("Processing sync request (force: {})", force);
                            let summary = self.run_handlers(None, force, &mut last_run).await;
                            let _ = response_tx.send(summary);
                        }
                        SyncRequest::Handler { name, force } => {
                            debug!("Processing sync request for '{}'", name);
                            let summary = self.run_handlers(Some(&name), force, &mut last_run).await;
                            let _ = response_tx.send(summary);
                        }
                    }
                }

                _ = tick.tick() => {
                    if let Ok(summary) = self.run_handlers(None, false, &mut last_run).await {
                        if summary.executed > 0 || summary.failed > 0 {
                            info!(
                                "Periodic sync completed: {} executed, {} skipped, {} failed",
                                summary.executed, summary.skipped, summary.failed
                            );
                        }
                    }
                }
            }
        }

        info!("Sync scheduler shutting down");
    }

    /// Run the registered handlers, honoring intervals unless forced.
    async fn run_handlers(
        &self,
        only: Option<&str>,
        force: bool,
        last_run: &mut HashMap<String, Instant>,
    ) -> Result<SyncRunSummary> {
        let start = Instant::now();
        let site: Option<SiteId> = self.sites.current_site();
        let mut matched = false;
        let mut executed = 0;
        let mut skipped = 0;
        let mut failed = 0;

        for handler in &self.handlers {
            if let Some(name) = only {
                if handler.name() != name {
                    continue;
                }
            }
            matched = true;

            let Some(ref site) = site else {
                debug!("No current site, skipping '{}'", handler.name());
                skipped += 1;
                continue;
            };

            if handler.uses_network() && !self.network.is_online() {
                debug!("Device is offline, skipping '{}'", handler.name());
                skipped += 1;
                continue;
            }

            if !force {
                if let Some(last) = last_run.get(handler.name()) {
                    if last.elapsed() < handler.interval() {
                        skipped += 1;
                        continue;
                    }
                }
            }

            // At most one scheduled run per interval, even when the run fails.
            last_run.insert(handler.name().to_string(), Instant::now());

            match handler.execute(site).await {
                Ok(result) => {
                    executed += 1;
                    if result.updated {
                        info!("Sync handler '{}' sent changes", handler.name());
                    }
                }
                Err(e) => {
                    failed += 1;
                    error!("Sync handler '{}' failed: {}", handler.name(), e);
                }
            }
        }

        if let Some(name) = only {
            if !matched {
                return Err(Error::NotFound(format!(
                    "Sync handler '{}' is not registered",
                    name
                )));
            }
        }

        Ok(SyncRunSummary {
            executed,
            skipped,
            failed,
            duration: start.elapsed(),
        })
    }
}
