// libs/booking-cell/src/services/pricing.rs
use serde::{Deserialize, Serialize};

use crate::models::ServiceType;

/// Fallback share used when a historical row predates per-service splits.
pub const DEFAULT_PROVIDER_SHARE: i64 = 250;

/// Monetary figures frozen onto a booking at creation. Later pricing changes
/// never touch existing rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSplit {
    pub payment_amount: i64,
    pub provider_share: i64,
}

/// Pure price table: service type in, (charge, provider share) out.
pub fn payment_split(service_type: ServiceType) -> PaymentSplit {
    match service_type {
        ServiceType::PrescriptionReview => PaymentSplit {
            payment_amount: 200,
            provider_share: 100,
        },
        ServiceType::FullConsultation => PaymentSplit {
            payment_amount: 500,
            provider_share: 250,
        },
    }
}
