// libs/provider-cell/src/services/availability.rs
use chrono::NaiveDate;
use reqwest::Method;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AvailabilitySlot, ProviderError, TimeSlot};
use crate::services::catalog::SlotCatalogService;
use crate::services::sweeper::SweeperService;

/// Row shape for the ledger lookup: only the slot key matters here.
#[derive(Debug, Deserialize)]
struct ActiveBookingKey {
    slot_date: NaiveDate,
    slot_time: String,
}

/// Merges the slot catalog with the booking ledger into the single
/// externally-visible availability view. The catalog flag and the ledger are
/// mutated independently and can drift; this reconciliation is what callers
/// are expected to trust.
pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
    catalog: SlotCatalogService,
    sweeper: SweeperService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            catalog: SlotCatalogService::with_client(Arc::clone(&supabase)),
            sweeper: SweeperService::with_client(Arc::clone(&supabase)),
            supabase,
        }
    }

    /// `GetAvailability`: sweep expired windows, then report every remaining
    /// window with `is_booked = cached flag OR ledger-has-active-booking`.
    pub async fn get_availability(
        &self,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<AvailabilitySlot>, ProviderError> {
        self.sweeper.sweep_provider(provider_id, auth_token).await?;

        let provider = self.catalog.get_provider(provider_id, auth_token).await?;
        let active_keys = self.active_booking_keys(provider_id, auth_token).await?;

        debug!(
            "Reconciling {} slots against {} active bookings for provider {}",
            provider.slots.len(),
            active_keys.len(),
            provider_id
        );

        Ok(merge_availability(&provider.slots, &active_keys))
    }

    async fn active_booking_keys(
        &self,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<HashSet<(NaiveDate, String)>, ProviderError> {
        let path = format!(
            "/rest/v1/bookings?provider_id=eq.{}&status=in.(pending,confirmed)&select=slot_date,slot_time",
            provider_id
        );

        let rows: Vec<ActiveBookingKey> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ProviderError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| (row.slot_date, row.slot_time))
            .collect())
    }
}

/// The OR-combination is deliberate: a stale `false` on the catalog is
/// overridden by the ledger, while a stale `true` still blocks the slot
/// until something resets it — the ledger is the stronger signal, never a
/// silencer.
pub fn merge_availability(
    slots: &[TimeSlot],
    active_keys: &HashSet<(NaiveDate, String)>,
) -> Vec<AvailabilitySlot> {
    slots
        .iter()
        .map(|slot| AvailabilitySlot {
            slot_date: slot.slot_date,
            start_time: slot.start_time.clone(),
            end_time: slot.end_time.clone(),
            is_booked: slot.is_booked
                || active_keys.contains(&(slot.slot_date, slot.start_time.clone())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(date: (i32, u32, u32), start: &str, booked: bool) -> TimeSlot {
        TimeSlot {
            slot_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            start_time: start.to_string(),
            end_time: "11:00 PM".to_string(),
            is_booked: booked,
        }
    }

    fn key(date: (i32, u32, u32), start: &str) -> (NaiveDate, String) {
        (
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            start.to_string(),
        )
    }

    #[test]
    fn ledger_overrides_stale_false_flag() {
        let slots = vec![slot((2025, 1, 10), "10:00 AM", false)];
        let active: HashSet<_> = [key((2025, 1, 10), "10:00 AM")].into();

        let view = merge_availability(&slots, &active);
        assert!(view[0].is_booked);
    }

    #[test]
    fn stale_true_flag_still_reports_booked() {
        let slots = vec![slot((2025, 1, 10), "10:00 AM", true)];
        let view = merge_availability(&slots, &HashSet::new());
        assert!(view[0].is_booked);
    }

    #[test]
    fn open_slot_stays_open() {
        let slots = vec![
            slot((2025, 1, 10), "10:00 AM", false),
            slot((2025, 1, 10), "11:00 AM", false),
        ];
        let active: HashSet<_> = [key((2025, 1, 10), "11:00 AM")].into();

        let view = merge_availability(&slots, &active);
        assert!(!view[0].is_booked);
        assert!(view[1].is_booked);
    }

    #[test]
    fn preserves_catalog_order() {
        let slots = vec![
            slot((2025, 1, 12), "09:00", false),
            slot((2025, 1, 10), "10:00 AM", false),
        ];
        let view = merge_availability(&slots, &HashSet::new());
        assert_eq!(view[0].start_time, "09:00");
        assert_eq!(view[1].start_time, "10:00 AM");
    }
}
