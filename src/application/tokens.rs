//! OAuth2 access-token acquisition with a single cached token.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use crate::cache::{Expiring, TokenCache};

use super::commerce::{CommerceApi, CommerceApiError};

const METRIC_TOKEN_HIT: &str = "catalog_proxy_token_cache_hit_total";
const METRIC_TOKEN_MISS: &str = "catalog_proxy_token_cache_miss_total";

#[derive(Debug, Error)]
#[error("failed to obtain access token")]
pub struct AuthError {
    #[source]
    source: CommerceApiError,
}

impl AuthError {
    pub fn new(source: CommerceApiError) -> Self {
        Self { source }
    }
}

/// Hands out a bearer token, refreshing it from the authorization server once
/// the cached one has expired.
///
/// Concurrent refreshes are not coordinated: callers that miss together all
/// request a grant and the last one written wins. A failed refresh leaves the
/// previous token in place.
pub struct TokenManager {
    api: Arc<dyn CommerceApi>,
    cache: Arc<TokenCache>,
}

impl TokenManager {
    pub fn new(api: Arc<dyn CommerceApi>, cache: Arc<TokenCache>) -> Self {
        Self { api, cache }
    }

    pub async fn access_token(&self) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc();
        if let Some(token) = self.cache.get_at(now) {
            counter!(METRIC_TOKEN_HIT).increment(1);
            return Ok(token);
        }
        counter!(METRIC_TOKEN_MISS).increment(1);

        let grant = self.api.request_token().await.map_err(|err| {
            warn!(error = %err, "access token request failed");
            AuthError::new(err)
        })?;

        let expires_at = i64::try_from(grant.expires_in)
            .ok()
            .map(Duration::seconds)
            .and_then(|lifetime| now.checked_add(lifetime))
            .ok_or_else(|| {
                AuthError::new(CommerceApiError::decode(format!(
                    "token lifetime `{}` is out of range",
                    grant.expires_in
                )))
            })?;

        self.cache.set(grant.access_token.clone(), expires_at);
        debug!(
            expires_in = grant.expires_in,
            %expires_at,
            "access token refreshed"
        );
        Ok(grant.access_token)
    }

    /// The cached token entry, fresh or not.
    pub fn cached(&self) -> Option<Expiring<String>> {
        self.cache.peek()
    }
}
