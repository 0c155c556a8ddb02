// libs/booking-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE BOOKING MODELS
// ==============================================================================

/// A patient's claim on one provider+date+time. The slot reference is
/// denormalized (`slot_date`, `slot_time`) rather than a foreign key into the
/// provider's catalog, so the ledger stays authoritative even when catalog
/// entries come and go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub slot_date: NaiveDate,
    pub slot_time: String,
    pub service_type: ServiceType,
    pub status: BookingStatus,
    pub treatment_status: TreatmentStatus,
    pub payment_amount: i64,
    pub provider_share: i64,
    pub provider_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_id: String,
    pub patient_age: i32,
    pub patient_sex: String,
    pub prescription_url: String,
    pub meet_link: Option<String>,
    #[serde(default)]
    pub test_result_urls: Vec<String>,
    pub review: Option<String>,
    pub report_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    PrescriptionReview,
    FullConsultation,
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceType::PrescriptionReview => write!(f, "prescription_review"),
            ServiceType::FullConsultation => write!(f, "full_consultation"),
        }
    }
}

/// `Pending` is modeled and conflict-checked but never produced: bookings go
/// straight to `Confirmed` at creation. The reservation/confirmation
/// two-phase flow was never finished upstream and is deliberately left that
/// way here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Active bookings are the ones that occupy a slot.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Completed => write!(f, "completed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentStatus {
    Untreated,
    Treated,
}

impl fmt::Display for TreatmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreatmentStatus::Untreated => write!(f, "untreated"),
            TreatmentStatus::Treated => write!(f, "treated"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDetails {
    pub age: i32,
    pub sex: String,
    pub prescription_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub slot_date: NaiveDate,
    pub slot_time: String,
    pub service_type: ServiceType,
    pub patient_details: PatientDetails,
    /// Already verified by the payment gateway before this call.
    pub payment_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleBookingRequest {
    pub new_date: NaiveDate,
    pub new_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentStatusRequest {
    pub treatment_status: TreatmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteReportRequest {
    pub report_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetLinkRequest {
    pub meet_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResultRequest {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub review: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("Booking not found")]
    NotFound,

    #[error("Provider not found")]
    ProviderNotFound,

    #[error("Slot not available")]
    SlotUnavailable,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
