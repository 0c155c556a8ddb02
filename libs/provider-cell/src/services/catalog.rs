// libs/provider-cell/src/services/catalog.rs
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    parse_time_of_day, CreateProviderRequest, CreateSlotRequest, Provider, ProviderError,
    TimeSlot,
};

/// Owns the per-provider catalog of offered time windows. The catalog is
/// stored as an embedded JSON array on the provider row; every mutation is a
/// full-array replace.
pub struct SlotCatalogService {
    supabase: Arc<SupabaseClient>,
}

impl SlotCatalogService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn create_provider(
        &self,
        request: CreateProviderRequest,
        auth_token: &str,
    ) -> Result<Provider, ProviderError> {
        let now = Utc::now();
        let provider_data = json!({
            "id": request.id.unwrap_or_else(Uuid::new_v4),
            "full_name": request.full_name,
            "kind": request.kind,
            "slots": [],
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/providers",
                Some(auth_token),
                Some(provider_data),
                Some(headers),
            )
            .await
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        let provider: Provider = result
            .first()
            .cloned()
            .ok_or_else(|| ProviderError::DatabaseError("Failed to create provider".to_string()))
            .and_then(|row| {
                serde_json::from_value(row)
                    .map_err(|e| ProviderError::DatabaseError(format!("Failed to parse provider: {}", e)))
            })?;

        info!("Provider {} created ({})", provider.id, provider.kind);
        Ok(provider)
    }

    pub async fn get_provider(
        &self,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<Provider, ProviderError> {
        debug!("Fetching provider: {}", provider_id);

        let path = format!("/rest/v1/providers?id=eq.{}", provider_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ProviderError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| ProviderError::DatabaseError(format!("Failed to parse provider: {}", e)))
    }

    pub async fn list_providers(&self, auth_token: &str) -> Result<Vec<Provider>, ProviderError> {
        let result: Vec<Value> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/providers?order=created_at.asc",
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| ProviderError::DatabaseError(format!("Failed to parse provider: {}", e)))
            })
            .collect()
    }

    /// Add an offered window to the catalog. Both times must parse and the
    /// `(date, start_time)` pair must be unique within this provider.
    pub async fn add_slot(
        &self,
        provider_id: Uuid,
        request: CreateSlotRequest,
        auth_token: &str,
    ) -> Result<Provider, ProviderError> {
        let start = parse_time_of_day(&request.start_time).ok_or_else(|| {
            ProviderError::InvalidSlot(format!("Unparseable start time: {}", request.start_time))
        })?;
        let end = parse_time_of_day(&request.end_time).ok_or_else(|| {
            ProviderError::InvalidSlot(format!("Unparseable end time: {}", request.end_time))
        })?;
        if start >= end {
            return Err(ProviderError::InvalidSlot(
                "Start time must be before end time".to_string(),
            ));
        }

        let mut provider = self.get_provider(provider_id, auth_token).await?;

        if provider
            .slots
            .iter()
            .any(|slot| slot.matches(request.slot_date, &request.start_time))
        {
            return Err(ProviderError::InvalidSlot(format!(
                "A slot already exists for {} at {}",
                request.slot_date, request.start_time
            )));
        }

        provider.slots.push(TimeSlot {
            slot_date: request.slot_date,
            start_time: request.start_time,
            end_time: request.end_time,
            is_booked: false,
        });

        self.persist_slots(provider_id, &provider.slots, auth_token)
            .await?;

        info!(
            "Slot added for provider {} ({} slots total)",
            provider_id,
            provider.slots.len()
        );
        Ok(provider)
    }

    pub async fn remove_slot(
        &self,
        provider_id: Uuid,
        slot_date: NaiveDate,
        start_time: &str,
        auth_token: &str,
    ) -> Result<Provider, ProviderError> {
        let mut provider = self.get_provider(provider_id, auth_token).await?;

        let before = provider.slots.len();
        provider
            .slots
            .retain(|slot| !slot.matches(slot_date, start_time));

        if provider.slots.len() == before {
            return Err(ProviderError::SlotNotFound);
        }

        self.persist_slots(provider_id, &provider.slots, auth_token)
            .await?;
        Ok(provider)
    }

    /// Flip the cached `is_booked` flag on the matching catalog entry.
    /// Returns whether an entry matched; a missing entry is not an error —
    /// catalogs are advisory, not exhaustive.
    pub async fn set_slot_booked(
        &self,
        provider_id: Uuid,
        slot_date: NaiveDate,
        start_time: &str,
        is_booked: bool,
        auth_token: &str,
    ) -> Result<bool, ProviderError> {
        let mut provider = self.get_provider(provider_id, auth_token).await?;

        let mut matched = false;
        for slot in provider.slots.iter_mut() {
            if slot.matches(slot_date, start_time) {
                matched = true;
                slot.is_booked = is_booked;
            }
        }

        if matched {
            self.persist_slots(provider_id, &provider.slots, auth_token)
                .await?;
            debug!(
                "Slot {} {} on provider {} set is_booked={}",
                slot_date, start_time, provider_id, is_booked
            );
        }

        Ok(matched)
    }

    pub(crate) async fn persist_slots(
        &self,
        provider_id: Uuid,
        slots: &[TimeSlot],
        auth_token: &str,
    ) -> Result<(), ProviderError> {
        let path = format!("/rest/v1/providers?id=eq.{}", provider_id);
        let update_data = json!({
            "slots": slots,
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update_data),
                Some(headers),
            )
            .await
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(ProviderError::NotFound);
        }

        Ok(())
    }
}
