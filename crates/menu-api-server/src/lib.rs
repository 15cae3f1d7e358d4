pub mod config;
pub mod database;
pub mod handlers;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::get,
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use services::MenuService;

pub fn build_router(service: Arc<MenuService>) -> Router {
    let items = Router::new()
        .route(
            "/items",
            get(handlers::menu_items::list_items).post(handlers::menu_items::create_item),
        )
        .route(
            "/items/",
            get(handlers::menu_items::list_items).post(handlers::menu_items::create_item),
        )
        .route(
            "/items/{id}",
            get(handlers::menu_items::get_item)
                .patch(handlers::menu_items::update_item)
                .put(handlers::menu_items::update_item)
                .delete(handlers::menu_items::delete_item),
        )
        .route(
            "/items/{id}/",
            get(handlers::menu_items::get_item)
                .patch(handlers::menu_items::update_item)
                .put(handlers::menu_items::update_item)
                .delete(handlers::menu_items::delete_item),
        );

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .merge(items)
        .layer(Extension(service))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default()),
        )
}
