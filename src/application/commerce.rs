//! Port describing the upstream commerce platform.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::product::RawProduct;

/// Successful client-credentials grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Token lifetime in seconds as reported by the authorization server.
    pub expires_in: u64,
}

#[derive(Debug, Error)]
pub enum CommerceApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream responded with status {status}")]
    Status { status: u16, body: String },
    #[error("failed to decode upstream response: {0}")]
    Decode(String),
}

impl CommerceApiError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

#[async_trait]
pub trait CommerceApi: Send + Sync {
    /// Run the client-credentials grant against the authorization endpoint.
    async fn request_token(&self) -> Result<TokenGrant, CommerceApiError>;

    /// Fetch one raw product with a bearer token.
    async fn fetch_product(
        &self,
        access_token: &str,
        product_id: &str,
    ) -> Result<RawProduct, CommerceApiError>;
}
