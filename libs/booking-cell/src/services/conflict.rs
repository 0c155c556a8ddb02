// libs/booking-cell/src/services/conflict.rs
use chrono::NaiveDate;
use reqwest::Method;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use provider_cell::services::catalog::SlotCatalogService;

use crate::models::BookingError;

#[derive(Debug, Deserialize)]
struct ActiveBookingId {
    #[allow(dead_code)]
    id: Uuid,
}

/// Pre-flight check shared by booking creation and rescheduling. Storage
/// still enforces uniqueness on active (provider, date, time) rows, so this
/// is a fast path for a clean error, not the last line of defense.
pub struct SlotConflictService {
    supabase: Arc<SupabaseClient>,
    catalog: SlotCatalogService,
}

impl SlotConflictService {
    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            catalog: SlotCatalogService::with_client(supabase.clone()),
            supabase,
        }
    }

    /// A slot is claimable when no active booking holds it and the catalog
    /// entry (if one exists) is not flagged booked. `exclude` skips the
    /// caller's own booking during a reschedule.
    pub async fn ensure_slot_claimable(
        &self,
        provider_id: Uuid,
        slot_date: NaiveDate,
        slot_time: &str,
        exclude: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), BookingError> {
        let mut path = format!(
            "/rest/v1/bookings?provider_id=eq.{}&slot_date=eq.{}&slot_time=eq.{}&status=in.(pending,confirmed)&select=id",
            provider_id,
            slot_date,
            urlencoding::encode(slot_time)
        );
        if let Some(booking_id) = exclude {
            path.push_str(&format!("&id=neq.{}", booking_id));
        }

        let active: Vec<ActiveBookingId> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if !active.is_empty() {
            debug!(
                "Slot {} {} on provider {} already held by an active booking",
                slot_date, slot_time, provider_id
            );
            return Err(BookingError::SlotUnavailable);
        }

        let provider = self
            .catalog
            .get_provider(provider_id, auth_token)
            .await
            .map_err(|e| match e {
                provider_cell::models::ProviderError::NotFound => BookingError::ProviderNotFound,
                other => BookingError::DatabaseError(other.to_string()),
            })?;

        let flagged = provider
            .slots
            .iter()
            .any(|slot| slot.matches(slot_date, slot_time) && slot.is_booked);
        if flagged {
            return Err(BookingError::SlotUnavailable);
        }

        Ok(())
    }
}
