use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::services::{DeletePolicy, MenuService};

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    delete_policy: DeletePolicy,
}

pub async fn health_check(
    Extension(service): Extension<Arc<MenuService>>,
) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            delete_policy: service.delete_policy(),
        }),
    )
}

pub async fn readiness_check() -> StatusCode {
    StatusCode::OK
}
