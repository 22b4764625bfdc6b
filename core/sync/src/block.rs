//! Edit-time sync blocking.
//!
//! UI flows block synchronization of an entity while the user is editing it,
//! so a background sync cannot clobber the form state. Blocks are in-memory
//! only and disappear on restart.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::debug;

use satchel_common::{Error, Result, SiteId, SyncId};
use satchel_store::SiteRegistry;

type BlockKey = (SiteId, String, SyncId);

/// Named sync blocks per `(site, component, id)`.
///
/// A key stays blocked while at least one named operation holds it; several
/// independent flows (an edit form, an in-progress attempt) can block the
/// same entity without stepping on each other.
pub struct SyncBlocks {
    sites: Arc<SiteRegistry>,
    blocks: Mutex<HashMap<BlockKey, HashSet<String>>>,
}

impl SyncBlocks {
    /// Create a new block tracker.
    pub fn new(sites: Arc<SiteRegistry>) -> Self {
        Self {
            sites,
            blocks: Mutex::new(HashMap::new()),
        }
    }

    fn key(&self, component: &str, id: SyncId, site: Option<&SiteId>) -> Result<BlockKey> {
        let site = self.sites.resolve(site)?;
        Ok((site, component.to_string(), id))
    }

    /// Block sync of an entity on behalf of a named operation.
    ///
    /// Blocking twice under the same name is a no-op.
    ///
    /// # Errors
    /// - Site cannot be resolved
    pub fn block_operation(
        &self,
        component: &str,
        id: impl Into<SyncId>,
        operation: &str,
        site: Option<&SiteId>,
    ) -> Result<()> {
        let key = self.key(component, id.into(), site)?;
        debug!("Blocking {}#{} for '{}'", key.1, key.2, operation);
        self.blocks
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .insert(operation.to_string());
        Ok(())
    }

    /// Release one named operation's block on an entity.
    ///
    /// The entity unblocks once its last named operation is released.
    ///
    /// # Errors
    /// - Site cannot be resolved
    pub fn unblock_operation(
        &self,
        component: &str,
        id: impl Into<SyncId>,
        operation: &str,
        site: Option<&SiteId>,
    ) -> Result<()> {
        let key = self.key(component, id.into(), site)?;
        debug!("Unblocking {}#{} for '{}'", key.1, key.2, operation);
        let mut blocks = self.blocks.lock().unwrap();
        if let Some(operations) = blocks.get_mut(&key) {
            operations.remove(operation);
            if operations.is_empty() {
                blocks.remove(&key);
            }
        }
        Ok(())
    }

    /// Whether any operation currently blocks sync of the entity.
    ///
    /// `false` when the site cannot be resolved.
    pub fn is_blocked(&self, component: &str, id: impl Into<SyncId>, site: Option<&SiteId>) -> bool {
        match self.key(component, id.into(), site) {
            Ok(key) => self.blocks.lock().unwrap().contains_key(&key),
            Err(_) => false,
        }
    }

    /// Fail with [`Error::Blocked`] if the entity is blocked.
    ///
    /// # Errors
    /// - `Error::Blocked` when a block is held
    /// - Site cannot be resolved
    pub fn ensure_unblocked(
        &self,
        component: &str,
        id: impl Into<SyncId>,
        site: Option<&SiteId>,
    ) -> Result<()> {
        let key = self.key(component, id.into(), site)?;
        if self.blocks.lock().unwrap().contains_key(&key) {
            return Err(Error::Blocked(format!("{}#{}", key.1, key.2)));
        }
        Ok(())
    }

    /// Drop every block held for a site (logout path).
    pub fn clear_blocks(&self, site: &SiteId) {
        debug!("Clearing all blocks for site {}", site);
        self.blocks.lock().unwrap().retain(|key, _| &key.0 != site);
    }
}
