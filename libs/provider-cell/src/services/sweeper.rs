// libs/provider-cell/src/services/sweeper.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Provider, ProviderError, TimeSlot};
use crate::services::catalog::SlotCatalogService;

/// Removes past-dated windows from provider catalogs. Runs inline before
/// every availability read and as a batch entry point at process start or
/// from an external cron.
pub struct SweeperService {
    catalog: SlotCatalogService,
}

impl SweeperService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            catalog: SlotCatalogService::new(config),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            catalog: SlotCatalogService::with_client(supabase),
        }
    }

    /// Drop every expired window from one provider's catalog. Returns the
    /// number removed. Idempotent: an immediate second sweep removes zero.
    pub async fn sweep_provider(
        &self,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<usize, ProviderError> {
        let provider = self.catalog.get_provider(provider_id, auth_token).await?;
        self.sweep_loaded(&provider, auth_token).await
    }

    /// Batch sweep across every provider.
    pub async fn sweep_all(&self, auth_token: &str) -> Result<usize, ProviderError> {
        let providers = self.catalog.list_providers(auth_token).await?;

        let mut total = 0;
        for provider in &providers {
            total += self.sweep_loaded(provider, auth_token).await?;
        }

        info!("Sweep removed {} expired slots across {} providers", total, providers.len());
        Ok(total)
    }

    async fn sweep_loaded(
        &self,
        provider: &Provider,
        auth_token: &str,
    ) -> Result<usize, ProviderError> {
        let (kept, removed) = retain_unexpired(provider.slots.clone(), Utc::now());

        if removed > 0 {
            self.catalog
                .persist_slots(provider.id, &kept, auth_token)
                .await?;
            debug!("Swept {} expired slots from provider {}", removed, provider.id);
        }

        Ok(removed)
    }
}

/// Keep only slots whose end instant is strictly after `now`. Slots with an
/// unparseable end time are treated as expired and dropped.
pub fn retain_unexpired(slots: Vec<TimeSlot>, now: DateTime<Utc>) -> (Vec<TimeSlot>, usize) {
    let before = slots.len();
    let kept: Vec<TimeSlot> = slots
        .into_iter()
        .filter(|slot| matches!(slot.end_instant(), Some(end) if end > now))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}
