//! HTTP surface: product routes, health check, and request logging.

mod handlers;
mod middleware;
mod state;

pub use handlers::ValidationError;
pub use state::HttpState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer};

use crate::config::ServerSettings;

use self::{
    handlers::{batch_products, get_product, health},
    middleware::{log_responses, set_request_context},
};

/// Optional response layers toggled by configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterLayers {
    pub cors: bool,
    pub compression: bool,
}

impl From<&ServerSettings> for RouterLayers {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            cors: settings.cors,
            compression: settings.compression,
        }
    }
}

pub fn build_router(state: HttpState, layers: RouterLayers) -> Router {
    let mut router = Router::new()
        .route("/api/product/{product_id}", get(get_product))
        .route("/api/products", post(batch_products))
        .route("/health", get(health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context));

    if layers.compression {
        router = router.layer(CompressionLayer::new());
    }
    if layers.cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}
