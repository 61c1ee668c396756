use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheAdapter;
use crate::compiler::DEFAULT_SOFT_DELETE_FIELD;

/// Runtime configuration for a [`Service`](super::Service).
#[derive(Clone)]
pub struct ServiceConfig {
    /// Cache adapter used for reads; no caching when absent
    pub cache: Option<Arc<dyn CacheAdapter>>,
    /// Default TTL for cache writes
    pub ttl: Option<Duration>,
    /// Soft-delete marker; `None` makes every delete physical
    pub soft_delete_field: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache: None,
            ttl: None,
            soft_delete_field: Some(DEFAULT_SOFT_DELETE_FIELD.to_owned()),
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("cache", &self.cache.as_ref().map(|_| "CacheAdapter"))
            .field("ttl", &self.ttl)
            .field("soft_delete_field", &self.soft_delete_field)
            .finish()
    }
}

impl ServiceConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheAdapter>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn soft_delete_field(mut self, field: impl Into<String>) -> Self {
        self.soft_delete_field = Some(field.into());
        self
    }

    /// Disable soft-delete substitution
    #[must_use]
    pub fn without_soft_delete(mut self) -> Self {
        self.soft_delete_field = None;
        self
    }
}

/// Serializable subset of [`ServiceConfig`], as read from a settings file.
///
/// ```json
/// {"ttlSec": 60, "softDeleteField": "removedAt"}
/// ```
///
/// An absent `softDeleteField` keeps `deletedAt`; an explicit `null`
/// disables soft delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceSettings {
    pub ttl_sec: Option<u64>,
    #[serde(with = "::serde_with::rust::double_option")]
    pub soft_delete_field: Option<Option<String>>,
}

impl ServiceSettings {
    /// Build a config, attaching `cache` if given
    #[must_use]
    pub fn into_config(self, cache: Option<Arc<dyn CacheAdapter>>) -> ServiceConfig {
        let mut config = ServiceConfig {
            cache,
            ttl: self.ttl_sec.map(Duration::from_secs),
            ..ServiceConfig::default()
        };
        if let Some(field) = self.soft_delete_field {
            config.soft_delete_field = field;
        }
        config
    }
}
