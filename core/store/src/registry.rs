//! Site registry for resolving per-site stores.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

use satchel_common::{Error, Result, SiteId};

use crate::store::SyncStore;

/// Registry of logged-in sites and their sync stores.
///
/// One store instance per site; the registry also tracks which site is the
/// current one so callers can omit the site argument. Lookups are synchronous
/// so concurrency checks that must not suspend can use them.
pub struct SiteRegistry {
    stores: RwLock<HashMap<SiteId, Arc<dyn SyncStore>>>,
    current: RwLock<Option<SiteId>>,
}

impl SiteRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            stores: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
        }
    }

    /// Register a site and its store.
    ///
    /// # Errors
    /// - Returns error if the site is already registered
    pub fn register_site(&self, site: SiteId, store: Arc<dyn SyncStore>) -> Result<()> {
        let mut stores = self.stores.write().unwrap();
        if stores.contains_key(&site) {
            return Err(Error::AlreadyExists(format!(
                "Site '{}' is already registered",
                site
            )));
        }
        info!("Registered site {}", site);
        stores.insert(site, store);
        Ok(())
    }

    /// Remove a site and drop its store.
    ///
    /// Clears the current site if it was the removed one.
    ///
    /// # Errors
    /// - Site not registered
    pub fn remove_site(&self, site: &SiteId) -> Result<()> {
        let mut stores = self.stores.write().unwrap();
        if stores.remove(site).is_none() {
            return Err(Error::NotFound(format!("Site '{}' is not registered", site)));
        }

        let mut current = self.current.write().unwrap();
        if current.as_ref() == Some(site) {
            *current = None;
        }
        info!("Removed site {}", site);
        Ok(())
    }

    /// Set (or unset) the current site.
    ///
    /// # Errors
    /// - Site not registered
    pub fn set_current_site(&self, site: Option<SiteId>) -> Result<()> {
        if let Some(ref site) = site {
            if !self.stores.read().unwrap().contains_key(site) {
                return Err(Error::NotFound(format!("Site '{}' is not registered", site)));
            }
        }
        *self.current.write().unwrap() = site;
        Ok(())
    }

    /// Get the current site, if any.
    pub fn current_site(&self) -> Option<SiteId> {
        self.current.read().unwrap().clone()
    }

    /// Resolve an optional site argument to a concrete site id.
    ///
    /// # Errors
    /// - No site given and no current site set
    pub fn resolve(&self, site: Option<&SiteId>) -> Result<SiteId> {
        match site {
            Some(site) => Ok(site.clone()),
            None => self
                .current_site()
                .ok_or_else(|| Error::NotFound("No current site".to_string())),
        }
    }

    /// Resolve the store for an optional site argument.
    ///
    /// # Errors
    /// - Site cannot be resolved or is not registered
    pub fn store(&self, site: Option<&SiteId>) -> Result<Arc<dyn SyncStore>> {
        let site = self.resolve(site)?;
        self.stores
            .read()
            .unwrap()
            .get(&site)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Site '{}' is not registered", site)))
    }

    /// Get list of registered site ids.
    pub fn site_ids(&self) -> Vec<SiteId> {
        self.stores.read().unwrap().keys().cloned().collect()
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySyncStore;

    fn site(id: &str) -> SiteId {
        SiteId::new(id).unwrap()
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = SiteRegistry::new();
        registry
            .register_site(site("site1"), Arc::new(MemorySyncStore::new()))
            .unwrap();

        let store = registry.store(Some(&site("site1"))).unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = SiteRegistry::new();
        registry
            .register_site(site("site1"), Arc::new(MemorySyncStore::new()))
            .unwrap();

        let result = registry.register_site(site("site1"), Arc::new(MemorySyncStore::new()));
        assert!(result.is_err());
    }

    #[test]
    fn test_current_site_fallback() {
        let registry = SiteRegistry::new();
        registry
            .register_site(site("site1"), Arc::new(MemorySyncStore::new()))
            .unwrap();

        // No current site set yet.
        assert!(registry.store(None).is_err());

        registry.set_current_site(Some(site("site1"))).unwrap();
        assert!(registry.store(None).is_ok());
        assert_eq!(registry.resolve(None).unwrap(), site("site1"));
    }

    #[test]
    fn test_current_site_must_be_registered() {
        let registry = SiteRegistry::new();
        assert!(registry.set_current_site(Some(site("ghost"))).is_err());
    }

    #[test]
    fn test_remove_clears_current() {
        let registry = SiteRegistry::new();
        registry
            .register_site(site("site1"), Arc::new(MemorySyncStore::new()))
            .unwrap();
        registry.set_current_site(Some(site("site1"))).unwrap();

        registry.remove_site(&site("site1")).unwrap();
        assert!(registry.current_site().is_none());
        assert!(registry.remove_site(&site("site1")).is_err());
    }
}
