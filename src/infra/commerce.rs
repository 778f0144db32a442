//! reqwest adapter for the commerce platform port.

use std::time::Instant;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use metrics::histogram;
use reqwest::{Client, Response, header::AUTHORIZATION};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::{
    application::commerce::{CommerceApi, CommerceApiError, TokenGrant},
    config::UpstreamSettings,
    domain::product::RawProduct,
};

use super::error::InfraError;

const METRIC_UPSTREAM_MS: &str = "catalog_proxy_upstream_request_ms";
const GRANT_TYPE: &str = "client_credentials";

/// Talks to the authorization server and the product API over one pooled client.
#[derive(Clone)]
pub struct HttpCommerceApi {
    client: Client,
    auth_url: Url,
    api_base: Url,
    organization_id: String,
    scope: String,
    basic_credentials: String,
}

impl HttpCommerceApi {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .pool_max_idle_per_host(settings.pool_max_idle_per_host)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        if settings.api_base.cannot_be_a_base() {
            return Err(InfraError::configuration(format!(
                "`{}` cannot be used as an api base",
                settings.api_base
            )));
        }

        let credentials = format!(
            "{}:{}",
            settings.client_id,
            settings.client_secret.expose()
        );

        Ok(Self {
            client,
            auth_url: settings.auth_url.clone(),
            api_base: settings.api_base.clone(),
            organization_id: settings.organization_id.clone(),
            scope: settings.scope.clone(),
            basic_credentials: format!("Basic {}", STANDARD.encode(credentials)),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("catalog-proxy/", env!("CARGO_PKG_VERSION"))
    }

    /// `<api_base>/product/products/v1/organizations/<org>/products/<id>`
    pub fn product_url(&self, product_id: &str) -> Result<Url, CommerceApiError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| CommerceApiError::transport("api base cannot carry a path"))?
            .pop_if_empty()
            .extend([
                "product",
                "products",
                "v1",
                "organizations",
                self.organization_id.as_str(),
                "products",
                product_id,
            ]);
        Ok(url)
    }
}

#[async_trait]
impl CommerceApi for HttpCommerceApi {
    async fn request_token(&self) -> Result<TokenGrant, CommerceApiError> {
        let started = Instant::now();
        let result = self
            .client
            .post(self.auth_url.clone())
            .header(AUTHORIZATION, &self.basic_credentials)
            .form(&[("grant_type", GRANT_TYPE), ("scope", self.scope.as_str())])
            .send()
            .await;
        record_latency("token", started);

        let grant: TokenGrant = decode(result).await?;
        debug!(expires_in = grant.expires_in, "access token granted");
        Ok(grant)
    }

    async fn fetch_product(
        &self,
        access_token: &str,
        product_id: &str,
    ) -> Result<RawProduct, CommerceApiError> {
        let url = self.product_url(product_id)?;

        let started = Instant::now();
        let result = self.client.get(url).bearer_auth(access_token).send().await;
        record_latency("product", started);

        decode(result).await
    }
}

fn record_latency(endpoint: &'static str, started: Instant) {
    histogram!(METRIC_UPSTREAM_MS, "endpoint" => endpoint)
        .record(started.elapsed().as_secs_f64() * 1000.0);
}

async fn decode<T: DeserializeOwned>(
    result: Result<Response, reqwest::Error>,
) -> Result<T, CommerceApiError> {
    let response = result.map_err(CommerceApiError::transport)?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CommerceApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(CommerceApiError::transport)?;
    serde_json::from_slice(&bytes).map_err(CommerceApiError::decode)
}
