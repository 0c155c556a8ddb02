use std::sync::Arc;

use axum::{routing::get, Router};

use booking_cell::router::booking_routes;
use provider_cell::router::provider_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "CareBook API is running!" }))
        .nest("/providers", provider_routes(state.clone()))
        .nest("/bookings", booking_routes(state.clone()))
}
