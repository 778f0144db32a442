//! Process-local caches for the access token and shaped products.
//!
//! - **Token slot**: a single access token with the expiry reported by the
//!   authorization server.
//! - **Product map**: shaped products keyed by product id, each with a fixed TTL.
//!
//! Both are plain owned values; services receive them at construction and the
//! process drops them on shutdown.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! product_ttl_seconds = 86400
//! coalesce_inflight = false
//! ```

mod config;
mod inflight;
mod lock;
mod store;

pub use config::CacheConfig;
pub use inflight::{FetchGuard, InFlightFetches};
pub use store::{Expiring, ExpiringMap, ExpiringSlot};

use crate::domain::product::ShapedProduct;

/// Cache holding the current access token.
pub type TokenCache = ExpiringSlot<String>;

/// Cache holding shaped products by product id.
pub type ProductCache = ExpiringMap<String, ShapedProduct>;
