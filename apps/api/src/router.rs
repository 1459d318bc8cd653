use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use scheduling_cell::router::scheduling_routes;
use shared_config::AppConfig;

async fn features(State(config): State<Arc<AppConfig>>) -> Json<Value> {
    Json(json!(config.features()))
}

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Salon scheduling API is running!" }))
        .route("/features", get(features))
        .with_state(state.clone())
        .nest("/scheduling", scheduling_routes(state))
}
