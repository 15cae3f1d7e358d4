//! Domain errors and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors produced by the tree store and its repositories.
#[derive(Error, Debug)]
pub enum MenuError {
    #[error("Menu item not found")]
    NotFound,

    #[error("Parent item does not exist")]
    ParentNotFound,

    #[error("Menu item name already exists: {0}")]
    DuplicateName(String),

    #[error("Menu item name may not be blank")]
    BlankName,

    #[error("Cannot delete a parent item with children")]
    HasChildren,

    #[error("Cycle detected in menu tree")]
    CycleDetected,

    #[error("Database error: {0}")]
    Database(String),
}

/// Request-boundary error: carries the status and wire body for a failure.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        field: Option<&'static str>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<MenuError> for ApiError {
    fn from(err: MenuError) -> Self {
        match err {
            MenuError::NotFound => ApiError::NotFound("Menu item not found.".to_string()),
            MenuError::ParentNotFound => ApiError::BadRequest {
                message: "Parent item does not exist.".to_string(),
                field: None,
            },
            MenuError::DuplicateName(name) => ApiError::BadRequest {
                message: format!("A menu item named '{}' already exists.", name),
                field: Some("name"),
            },
            MenuError::BlankName => ApiError::BadRequest {
                message: "Name may not be blank.".to_string(),
                field: Some("name"),
            },
            MenuError::HasChildren => ApiError::BadRequest {
                message: "Cannot delete a parent item with children.".to_string(),
                field: None,
            },
            MenuError::CycleDetected => ApiError::BadRequest {
                message: "Operation would create a cycle in the menu tree.".to_string(),
                field: None,
            },
            MenuError::Database(msg) => ApiError::Internal(msg),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, field) = match self {
            ApiError::NotFound(msg) => {
                tracing::warn!("Not found: {}", msg);
                (StatusCode::NOT_FOUND, msg, None)
            }
            ApiError::BadRequest { message, field } => {
                tracing::warn!("Bad request: {}", message);
                (StatusCode::BAD_REQUEST, message, field)
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error.".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            field,
        });

        (status, body).into_response()
    }
}
