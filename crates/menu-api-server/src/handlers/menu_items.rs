//! CRUD handlers for /items.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use uuid::Uuid;

use crate::services::menu_service::{MenuDetail, MenuItemView, MenuListing};
use crate::services::{MenuItemChanges, MenuService};
use crate::utils::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateMenuItemRequest {
    pub name: String,
    /// Parent is addressed by id on the write side; responses carry the
    /// parent's name.
    #[serde(default)]
    pub parent: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMenuItemRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// Absent = keep the current parent, null = move to the top level,
    /// id = reparent.
    #[serde(default, deserialize_with = "double_option")]
    pub parent: Option<Option<Uuid>>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

pub async fn list_items(
    Extension(service): Extension<Arc<MenuService>>,
) -> Result<Json<MenuListing>, ApiError> {
    let listing = service.list().await?;
    Ok(Json(listing))
}

pub async fn get_item(
    Extension(service): Extension<Arc<MenuService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MenuDetail>, ApiError> {
    let detail = service.get(id).await?;
    Ok(Json(detail))
}

pub async fn create_item(
    Extension(service): Extension<Arc<MenuService>>,
    Json(request): Json<CreateMenuItemRequest>,
) -> Result<(StatusCode, Json<MenuItemView>), ApiError> {
    let created = service.create(request.name, request.parent).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_item(
    Extension(service): Extension<Arc<MenuService>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMenuItemRequest>,
) -> Result<Json<MenuItemView>, ApiError> {
    let changes = MenuItemChanges {
        name: request.name,
        parent: request.parent,
    };
    let updated = service.update(id, changes).await?;
    Ok(Json(updated))
}

pub async fn delete_item(
    Extension(service): Extension<Arc<MenuService>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
