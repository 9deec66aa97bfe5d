pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;

use std::sync::Arc;

use axum::{routing::get, Router};
use db::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub base_path: Arc<String>,
}

pub fn create_app(state: AppState) -> Router {
    let base_path = state.base_path.clone();

    let app_routes = Router::new()
        .route(
            "/api/auth",
            get(handlers::auth::login).post(handlers::auth::register),
        )
        .route(
            "/api/todo",
            get(handlers::todo::list_all_todos).post(handlers::todo::create_new_todo),
        )
        .route(
            "/api/todo/{id}",
            get(handlers::todo::get_single_todo)
                .put(handlers::todo::update_existing_todo)
                .delete(handlers::todo::delete_existing_todo),
        )
        .layer(
            tower::ServiceBuilder::new()
                .layer(tower_http::trace::TraceLayer::new_for_http())
                .layer(tower_http::compression::CompressionLayer::new()),
        )
        .with_state(state);

    tracing::info!("base_path: {base_path:?}");

    if base_path.is_empty() {
        app_routes
    } else {
        Router::new().nest(&base_path, app_routes)
    }
}
