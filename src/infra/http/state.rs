use std::sync::Arc;

use crate::application::products::ProductService;

#[derive(Clone)]
pub struct HttpState {
    pub products: Arc<ProductService>,
}

impl HttpState {
    pub fn new(products: ProductService) -> Self {
        Self {
            products: Arc::new(products),
        }
    }
}
