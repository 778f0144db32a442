//! Cache configuration.

use std::time::Duration;

const DEFAULT_PRODUCT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Runtime cache behaviour resolved from `[cache]` settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a shaped product is served before it is refetched.
    pub product_ttl: Duration,
    /// Serialize concurrent misses for the same product id.
    pub coalesce_inflight: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            product_ttl: DEFAULT_PRODUCT_TTL,
            coalesce_inflight: false,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            product_ttl: settings.product_ttl,
            coalesce_inflight: settings.coalesce_inflight,
        }
    }
}
