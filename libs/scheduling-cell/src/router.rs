// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn scheduling_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route(
            "/businesses/{business_id}/slots",
            get(handlers::find_available_slots),
        )
        .route(
            "/businesses/{business_id}/availability",
            get(handlers::check_availability),
        )
        .route(
            "/businesses/{business_id}/appointments/smart-book",
            post(handlers::smart_book_appointment),
        )
        .route(
            "/businesses/{business_id}/rules/defaults",
            post(handlers::seed_default_rules),
        )
        .with_state(state)
}
