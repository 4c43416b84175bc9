use axum::{http::StatusCode, Json};
use common::types::Health;

use crate::errors::ApiError;

pub async fn health() -> Json<Health> {
    Json(Health::ok())
}

pub async fn metrics() -> Result<String, ApiError> {
    service::observability::encode_metrics()
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}")))
}
