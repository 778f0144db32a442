//! Product retrieval: cache lookup, upstream fetch, shaping, and batch fan-out.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use indexmap::{IndexMap, IndexSet};
use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, error, warn};

use crate::{
    cache::{CacheConfig, InFlightFetches, ProductCache},
    domain::{error::DomainError, product::ShapedProduct, shaping::shape},
};

use super::{
    commerce::{CommerceApi, CommerceApiError},
    tokens::{AuthError, TokenManager},
};

const METRIC_PRODUCT_HIT: &str = "catalog_proxy_product_cache_hit_total";
const METRIC_PRODUCT_MISS: &str = "catalog_proxy_product_cache_miss_total";

/// Inline marker reported for a batch item that could not be fetched.
pub const BATCH_ITEM_ERROR: &str = "Failed to fetch data";

#[derive(Debug, Error)]
pub enum UpstreamFetchError {
    #[error("product request failed")]
    Request(#[source] CommerceApiError),
    #[error("product data could not be shaped")]
    Shape(#[source] DomainError),
}

#[derive(Debug, Error)]
pub enum ProductError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Upstream(#[from] UpstreamFetchError),
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("fetch task for product `{product_id}` did not complete: {reason}")]
    Join { product_id: String, reason: String },
}

/// Outcome of one batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Product(ShapedProduct),
    Failed { error: &'static str },
}

impl BatchEntry {
    fn failed() -> Self {
        Self::Failed {
            error: BATCH_ITEM_ERROR,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Product id → outcome, in request order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct BatchOutcome(IndexMap<String, BatchEntry>);

impl BatchOutcome {
    pub fn get(&self, product_id: &str) -> Option<&BatchEntry> {
        self.0.get(product_id)
    }

    pub fn product_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn failures(&self) -> usize {
        self.0.values().filter(|entry| entry.is_failed()).count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Serves shaped products from the product cache, fetching and shaping them on
/// a miss.
#[derive(Clone)]
pub struct ProductService {
    api: Arc<dyn CommerceApi>,
    tokens: Arc<TokenManager>,
    cache: Arc<ProductCache>,
    inflight: Option<InFlightFetches>,
    product_ttl: Duration,
    cdn_base: Arc<str>,
}

impl ProductService {
    pub fn new(
        api: Arc<dyn CommerceApi>,
        tokens: Arc<TokenManager>,
        cache: Arc<ProductCache>,
        config: &CacheConfig,
        cdn_base: &str,
    ) -> Self {
        Self {
            api,
            tokens,
            cache,
            inflight: config.coalesce_inflight.then(InFlightFetches::new),
            product_ttl: config.product_ttl,
            cdn_base: Arc::from(cdn_base),
        }
    }

    /// Return the shaped product for `product_id`.
    ///
    /// Each call records exactly one cache hit or miss. With coalescing on, a
    /// caller that finds the entry refreshed after waiting for the gate counts
    /// as a hit.
    pub async fn product(&self, product_id: &str) -> Result<ShapedProduct, ProductError> {
        if let Some(product) = self.cached(product_id) {
            return Ok(product);
        }

        let Some(inflight) = self.inflight.as_ref() else {
            counter!(METRIC_PRODUCT_MISS).increment(1);
            return self.refresh(product_id).await;
        };

        let _gate = inflight.acquire(product_id).await;
        if let Some(product) = self.cached(product_id) {
            return Ok(product);
        }
        counter!(METRIC_PRODUCT_MISS).increment(1);
        self.refresh(product_id).await
    }

    fn cached(&self, product_id: &str) -> Option<ShapedProduct> {
        let product = self.cache.get_at(product_id, OffsetDateTime::now_utc())?;
        counter!(METRIC_PRODUCT_HIT).increment(1);
        Some(product)
    }

    /// Fetch every id concurrently and report each outcome separately.
    ///
    /// Duplicate ids are fetched once. Every task is awaited before the
    /// outcome is assembled; one failing item never cancels the others. A task
    /// that panics counts as a failed item; only a cancelled task fails the
    /// whole batch.
    pub async fn products(&self, product_ids: &[String]) -> Result<BatchOutcome, BatchError> {
        let ids: IndexSet<&str> = product_ids.iter().map(String::as_str).collect();

        let tasks = ids.iter().map(|product_id| {
            let service = self.clone();
            let product_id = product_id.to_string();
            tokio::spawn(async move { service.product(&product_id).await })
        });
        let settled = join_all(tasks).await;

        let mut outcome = IndexMap::with_capacity(ids.len());
        for (product_id, result) in ids.into_iter().zip(settled) {
            let entry = match result {
                Ok(Ok(product)) => BatchEntry::Product(product),
                Ok(Err(err)) => {
                    warn!(product_id, error = %err, "batch item failed");
                    BatchEntry::failed()
                }
                Err(join_err) if join_err.is_panic() => {
                    error!(product_id, error = %join_err, "batch item task panicked");
                    BatchEntry::failed()
                }
                Err(join_err) => {
                    return Err(BatchError::Join {
                        product_id: product_id.to_string(),
                        reason: join_err.to_string(),
                    });
                }
            };
            outcome.insert(product_id.to_string(), entry);
        }

        Ok(BatchOutcome(outcome))
    }

    async fn refresh(&self, product_id: &str) -> Result<ShapedProduct, ProductError> {
        let now = OffsetDateTime::now_utc();
        let token = self.tokens.access_token().await?;

        let raw = self
            .api
            .fetch_product(&token, product_id)
            .await
            .map_err(|err| {
                warn!(product_id, error = %err, "product request failed");
                UpstreamFetchError::Request(err)
            })?;

        let product = shape(&raw, &self.cdn_base).map_err(|err| {
            warn!(product_id, error = %err, "product data could not be shaped");
            UpstreamFetchError::Shape(err)
        })?;

        let expires_at = now + self.product_ttl;
        self.cache
            .insert(product_id.to_string(), product.clone(), expires_at);
        debug!(product_id, colors = product.len(), %expires_at, "product cached");

        Ok(product)
    }
}
