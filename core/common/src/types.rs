//! Common types used throughout Satchel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a site (one backend instance the client is logged
/// into). All persistent sync bookkeeping is scoped by site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteId(String);

impl SiteId {
    /// Create a new SiteId from a string.
    ///
    /// # Errors
    /// - Returns error if id is empty
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::InvalidInput(
                "SiteId cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the entity a sync applies to, e.g. a course module id.
///
/// Feature modules identify entities either numerically or by an arbitrary
/// string key; both normalize to the same stored representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncId(String);

impl SyncId {
    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SyncId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SyncId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<i64> for SyncId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for SyncId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<u32> for SyncId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
