//! Satchel Sync Core
//!
//! This module provides the sync coordination layer feature modules build on,
//! including:
//! - Per-component bookkeeping of last-sync times and warnings
//! - Mutual-exclusion tracking of in-flight syncs with awaitable handles
//! - Edit-time sync blocking
//! - Periodic scheduling of registered feature handlers

pub mod block;
pub mod coordinator;
pub mod handler;
pub mod scheduler;

// Re-export main types
pub use block::SyncBlocks;
pub use coordinator::{SharedSync, SyncCoordinator, DEFAULT_SYNC_INTERVAL};
pub use handler::{SyncHandler, SyncResult};
pub use scheduler::{
    NetworkStatus, SyncRequest, SyncRunSummary, SyncScheduler, SyncSchedulerHandle,
    DEFAULT_CHECK_PERIOD,
};
