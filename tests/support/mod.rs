#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use catalog_proxy::{
    application::{
        commerce::{CommerceApi, CommerceApiError, TokenGrant},
        products::ProductService,
        tokens::TokenManager,
    },
    cache::{CacheConfig, ProductCache, TokenCache},
    domain::product::RawProduct,
};
use serde_json::{Value, json};

pub const CDN_BASE: &str = "https://cdn.example.com";

/// Scripted commerce platform for router-level tests.
#[derive(Default)]
pub struct ScriptedCommerce {
    products: Mutex<HashMap<String, Value>>,
    delays: Mutex<HashMap<String, Duration>>,
    panics: Mutex<HashSet<String>>,
    token_calls: AtomicUsize,
    product_calls: AtomicUsize,
}

impl ScriptedCommerce {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(self, id: &str, body: Value) -> Self {
        self.products
            .lock()
            .expect("products lock")
            .insert(id.to_string(), body);
        self
    }

    pub fn with_delay(self, id: &str, delay: Duration) -> Self {
        self.delays
            .lock()
            .expect("delays lock")
            .insert(id.to_string(), delay);
        self
    }

    pub fn with_panic(self, id: &str) -> Self {
        self.panics
            .lock()
            .expect("panics lock")
            .insert(id.to_string());
        self
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn product_calls(&self) -> usize {
        self.product_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommerceApi for ScriptedCommerce {
    async fn request_token(&self) -> Result<TokenGrant, CommerceApiError> {
        let call = self.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TokenGrant {
            access_token: format!("token-{call}"),
            expires_in: 1800,
        })
    }

    async fn fetch_product(
        &self,
        _access_token: &str,
        product_id: &str,
    ) -> Result<RawProduct, CommerceApiError> {
        self.product_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self
            .delays
            .lock()
            .expect("delays lock")
            .get(product_id)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.panics.lock().expect("panics lock").contains(product_id) {
            panic!("scripted panic for {product_id}");
        }

        let body = self
            .products
            .lock()
            .expect("products lock")
            .get(product_id)
            .cloned();
        match body {
            Some(body) => serde_json::from_value(body).map_err(CommerceApiError::decode),
            None => Err(CommerceApiError::Status {
                status: 404,
                body: "not found".to_string(),
            }),
        }
    }
}

pub fn product_service(api: Arc<ScriptedCommerce>) -> ProductService {
    let api: Arc<dyn CommerceApi> = api;
    let tokens = Arc::new(TokenManager::new(api.clone(), Arc::new(TokenCache::new())));
    ProductService::new(
        api,
        tokens,
        Arc::new(ProductCache::new()),
        &CacheConfig::default(),
        CDN_BASE,
    )
}

/// Catalogue payload with one image group per `(colour, file)` pair.
pub fn raw_product(groups: &[(&str, &str)]) -> Value {
    let image_groups: Vec<Value> = groups
        .iter()
        .map(|(color, file)| {
            json!({
                "viewType": "large",
                "variationAttributes": [{ "id": "color", "values": [{ "value": color }] }],
                "images": [{
                    "absUrl": format!("https://upstream.example.net/dw/image/v2/{file}?sw=800"),
                    "alt": { "default": format!("{color} alt") },
                    "title": { "default": format!("{color} title") }
                }]
            })
        })
        .collect();

    json!({ "id": "ignored", "imageGroups": image_groups })
}
