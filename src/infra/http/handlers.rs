use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use thiserror::Error;

use crate::application::error::HttpError;

use super::state::HttpState;

const PRODUCT_IDS_FIELD: &str = "productIds";

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("request body is not valid JSON: {0}")]
    Body(String),
    #[error("`productIds` must be an array of strings")]
    ProductIds,
}

impl From<ValidationError> for HttpError {
    fn from(error: ValidationError) -> Self {
        let public_message = match &error {
            ValidationError::Body(_) => "Invalid request body",
            ValidationError::ProductIds => "productIds must be an array of strings",
        };
        HttpError::from_error(
            "infra::http::handlers::batch_products",
            StatusCode::BAD_REQUEST,
            public_message,
            &error,
        )
    }
}

pub async fn get_product(
    State(state): State<HttpState>,
    Path(product_id): Path<String>,
) -> Response {
    match state.products.product(&product_id).await {
        Ok(product) => Json(product).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub async fn batch_products(
    State(state): State<HttpState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let product_ids = match body
        .map_err(|rejection| ValidationError::Body(rejection.body_text()))
        .and_then(|Json(value)| product_ids(&value))
    {
        Ok(ids) => ids,
        Err(err) => return HttpError::from(err).into_response(),
    };

    match state.products.products(&product_ids).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Every element must be a string; nothing is fetched for a partially valid list.
fn product_ids(body: &Value) -> Result<Vec<String>, ValidationError> {
    let Some(Value::Array(items)) = body.get(PRODUCT_IDS_FIELD) else {
        return Err(ValidationError::ProductIds);
    };

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or(ValidationError::ProductIds)
        })
        .collect()
}
