// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    BookingError, CompleteReportRequest, CreateBookingRequest, MeetLinkRequest,
    RescheduleBookingRequest, ReviewRequest, TestResultRequest, TreatmentStatusRequest,
};
use crate::services::booking::BookingService;

fn map_booking_error(e: BookingError) -> AppError {
    match e {
        BookingError::NotFound => AppError::NotFound("Booking not found".to_string()),
        BookingError::ProviderNotFound => AppError::NotFound("Provider not found".to_string()),
        BookingError::SlotUnavailable => AppError::Conflict("Slot not available".to_string()),
        BookingError::Forbidden(msg) => AppError::Forbidden(msg),
        BookingError::InvalidState(msg) => AppError::BadRequest(msg),
        BookingError::InvalidInput(msg) => AppError::BadRequest(msg),
        BookingError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<Value>, AppError> {
    // Patients book for themselves; admins may book on a patient's behalf.
    if user.id != request.patient_id.to_string() && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Cannot create a booking for another patient".to_string(),
        ));
    }

    let service = BookingService::new(&state);
    let booking = service
        .create_booking(request, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking
    })))
}

#[axum::debug_handler]
pub async fn get_booking(
    State(state): State<Arc<AppConfig>>,
    Path(booking_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let booking = service
        .get_booking(booking_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    let involved = user.id == booking.patient_id.to_string()
        || user.id == booking.provider_id.to_string();
    if !involved && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to view this booking".to_string(),
        ));
    }

    Ok(Json(json!(booking)))
}

#[axum::debug_handler]
pub async fn list_patient_bookings(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if user.id != patient_id.to_string() && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to view this patient's bookings".to_string(),
        ));
    }

    let service = BookingService::new(&state);
    let bookings = service
        .list_patient_bookings(patient_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({ "bookings": bookings })))
}

#[axum::debug_handler]
pub async fn list_provider_bookings(
    State(state): State<Arc<AppConfig>>,
    Path(provider_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if user.id != provider_id.to_string() && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to view this provider's bookings".to_string(),
        ));
    }

    let service = BookingService::new(&state);
    let bookings = service
        .list_provider_bookings(provider_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({ "bookings": bookings })))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<Arc<AppConfig>>,
    Path(booking_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let booking = service
        .cancel_booking(booking_id, &user, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
        "message": "Booking cancelled"
    })))
}

#[axum::debug_handler]
pub async fn reschedule_booking(
    State(state): State<Arc<AppConfig>>,
    Path(booking_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let booking = service
        .reschedule_booking(booking_id, request, &user, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
        "message": "Booking rescheduled"
    })))
}

#[axum::debug_handler]
pub async fn set_treatment_status(
    State(state): State<Arc<AppConfig>>,
    Path(booking_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<TreatmentStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let booking = service
        .set_treatment_status(booking_id, request, &user, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking
    })))
}

#[axum::debug_handler]
pub async fn complete_with_report(
    State(state): State<Arc<AppConfig>>,
    Path(booking_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CompleteReportRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let booking = service
        .complete_with_report(booking_id, request, &user, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
        "message": "Booking completed"
    })))
}

#[axum::debug_handler]
pub async fn set_meet_link(
    State(state): State<Arc<AppConfig>>,
    Path(booking_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<MeetLinkRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let booking = service
        .set_meet_link(booking_id, request, &user, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking
    })))
}

#[axum::debug_handler]
pub async fn append_test_result(
    State(state): State<Arc<AppConfig>>,
    Path(booking_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<TestResultRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let booking = service
        .append_test_result(booking_id, request, &user, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking
    })))
}

#[axum::debug_handler]
pub async fn set_review(
    State(state): State<Arc<AppConfig>>,
    Path(booking_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let booking = service
        .set_review(booking_id, request, &user, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking
    })))
}

/// Back-office payout approval.
#[axum::debug_handler]
pub async fn mark_provider_paid(
    State(state): State<Arc<AppConfig>>,
    Path(booking_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins can approve payouts".to_string(),
        ));
    }

    let service = BookingService::new(&state);
    let booking = service
        .mark_provider_paid(booking_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
        "message": "Provider payout approved"
    })))
}
