//! Per-site sync bookkeeping storage for Satchel.
//!
//! This module provides a trait-based interface for the persistent store
//! behind sync bookkeeping (last-sync times and warnings), durable and
//! in-memory implementations, and a registry resolving the store for each
//! logged-in site.
//!
//! # Design Principles
//! - Store isolation: no sync logic in store implementations
//! - Async operations: all record I/O is async
//! - Miss-tolerant reads: absent records are `Ok(None)`, not errors
//! - Unified error semantics: consistent error types across backends

pub mod memory;
pub mod registry;
pub mod sqlite;
pub mod store;

pub use memory::MemorySyncStore;
pub use registry::SiteRegistry;
pub use sqlite::SqliteSyncStore;
pub use store::{SyncRecord, SyncStore, SyncWarningsRecord};
