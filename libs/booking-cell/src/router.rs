// libs/booking-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn booking_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::create_booking))
        .route("/{booking_id}", get(handlers::get_booking))
        .route("/{booking_id}/cancel", post(handlers::cancel_booking))
        .route("/{booking_id}/reschedule", patch(handlers::reschedule_booking))
        .route("/{booking_id}/treatment", patch(handlers::set_treatment_status))
        .route("/{booking_id}/report", post(handlers::complete_with_report))
        .route("/{booking_id}/meet-link", patch(handlers::set_meet_link))
        .route("/{booking_id}/test-results", post(handlers::append_test_result))
        .route("/{booking_id}/review", post(handlers::set_review))
        .route("/{booking_id}/mark-paid", post(handlers::mark_provider_paid))
        .route("/patients/{patient_id}", get(handlers::list_patient_bookings))
        .route("/providers/{provider_id}", get(handlers::list_provider_bookings))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
