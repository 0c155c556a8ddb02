// libs/provider-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn provider_routes(state: Arc<AppConfig>) -> Router {
    // All catalog operations require authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::create_provider))
        .route("/sweep", post(handlers::sweep_all))
        .route("/{provider_id}", get(handlers::get_provider))
        .route("/{provider_id}/availability", get(handlers::get_availability))
        .route("/{provider_id}/slots", post(handlers::add_slot))
        .route("/{provider_id}/slots", delete(handlers::remove_slot))
        .route("/{provider_id}/sweep", post(handlers::sweep_provider))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
