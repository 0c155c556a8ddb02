// libs/provider-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateProviderRequest, CreateSlotRequest, ProviderError, RemoveSlotRequest};
use crate::services::availability::AvailabilityService;
use crate::services::catalog::SlotCatalogService;
use crate::services::sweeper::SweeperService;

fn map_provider_error(e: ProviderError) -> AppError {
    match e {
        ProviderError::NotFound => AppError::NotFound("Provider not found".to_string()),
        ProviderError::SlotNotFound => AppError::NotFound("Slot not found".to_string()),
        ProviderError::InvalidSlot(msg) => AppError::BadRequest(msg),
        ProviderError::DatabaseError(msg) => AppError::Database(msg),
    }
}

/// Only the provider themselves or an admin may manage a catalog.
fn ensure_owner_or_admin(user: &User, provider_id: Uuid) -> Result<(), AppError> {
    let is_owner = user.id == provider_id.to_string();
    if !is_owner && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to manage this provider's slots".to_string(),
        ));
    }
    Ok(())
}

#[axum::debug_handler]
pub async fn create_provider(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateProviderRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins can register providers".to_string(),
        ));
    }

    let catalog = SlotCatalogService::new(&state);
    let provider = catalog
        .create_provider(request, auth.token())
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "success": true,
        "provider": provider
    })))
}

#[axum::debug_handler]
pub async fn get_provider(
    State(state): State<Arc<AppConfig>>,
    Path(provider_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let catalog = SlotCatalogService::new(&state);
    let provider = catalog
        .get_provider(provider_id, auth.token())
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!(provider)))
}

/// The availability view: sweeps first, then reconciles the catalog against
/// the booking ledger.
#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    Path(provider_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let availability = AvailabilityService::new(&state);
    let slots = availability
        .get_availability(provider_id, auth.token())
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "provider_id": provider_id,
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn add_slot(
    State(state): State<Arc<AppConfig>>,
    Path(provider_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSlotRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_owner_or_admin(&user, provider_id)?;

    let catalog = SlotCatalogService::new(&state);
    let provider = catalog
        .add_slot(provider_id, request, auth.token())
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "success": true,
        "provider": provider,
        "message": "Slot added"
    })))
}

#[axum::debug_handler]
pub async fn remove_slot(
    State(state): State<Arc<AppConfig>>,
    Path(provider_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(request): Query<RemoveSlotRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_owner_or_admin(&user, provider_id)?;

    let catalog = SlotCatalogService::new(&state);
    let provider = catalog
        .remove_slot(provider_id, request.slot_date, &request.start_time, auth.token())
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "success": true,
        "provider": provider,
        "message": "Slot removed"
    })))
}

#[axum::debug_handler]
pub async fn sweep_provider(
    State(state): State<Arc<AppConfig>>,
    Path(provider_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    ensure_owner_or_admin(&user, provider_id)?;

    let sweeper = SweeperService::new(&state);
    let removed = sweeper
        .sweep_provider(provider_id, auth.token())
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "success": true,
        "removed": removed
    })))
}

/// Batch entry point for the external cron job.
#[axum::debug_handler]
pub async fn sweep_all(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins can run a full sweep".to_string(),
        ));
    }

    let sweeper = SweeperService::new(&state);
    let removed = sweeper
        .sweep_all(auth.token())
        .await
        .map_err(map_provider_error)?;

    Ok(Json(json!({
        "success": true,
        "removed": removed
    })))
}
