// libs/provider-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// PROVIDER & SLOT CATALOG MODELS
// ==============================================================================

/// A consultation provider. Pharmacists, doctors and nutritionists are
/// structurally identical here; `kind` only matters for display and search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    pub full_name: String,
    pub kind: ProviderKind,
    /// Offered time windows, in insertion order (insertion order = display
    /// order). Slot identity is the `(slot_date, start_time)` pair.
    #[serde(default)]
    pub slots: Vec<TimeSlot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Pharmacist,
    Doctor,
    Nutritionist,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Pharmacist => write!(f, "pharmacist"),
            ProviderKind::Doctor => write!(f, "doctor"),
            ProviderKind::Nutritionist => write!(f, "nutritionist"),
        }
    }
}

/// A provider-declared time window. Times are stored as entered
/// (`"10:30 AM"` or `"22:30"`); `is_booked` is a locally cached flag that
/// can drift from the booking ledger, which is why availability reads
/// reconcile against the ledger instead of trusting it alone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    pub slot_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub is_booked: bool,
}

impl TimeSlot {
    pub fn matches(&self, date: NaiveDate, start_time: &str) -> bool {
        self.slot_date == date && self.start_time == start_time
    }

    /// The instant at which this window ends, or `None` when the end time
    /// cannot be parsed. The sweeper drops unparseable entries.
    pub fn end_instant(&self) -> Option<DateTime<Utc>> {
        let end = parse_time_of_day(&self.end_time)?;
        Some(self.slot_date.and_time(end).and_utc())
    }
}

/// Parse a human-entered time of day: `"10:30 AM"`, `"7:05 pm"` or 24-hour
/// `"22:30"`.
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let trimmed = value.trim();

    if let Ok(time) = NaiveTime::parse_from_str(&trimmed.to_uppercase(), "%I:%M %p") {
        return Some(time);
    }
    NaiveTime::parse_from_str(trimmed, "%H:%M").ok()
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProviderRequest {
    /// Defaults to a fresh id; admins pass the provider's auth id so
    /// ownership checks line up with the JWT subject.
    pub id: Option<Uuid>,
    pub full_name: String,
    pub kind: ProviderKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    pub slot_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveSlotRequest {
    pub slot_date: NaiveDate,
    pub start_time: String,
}

/// Externally-visible availability view: the catalog merged with the
/// booking ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilitySlot {
    pub slot_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub is_booked: bool,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider not found")]
    NotFound,

    #[error("Slot not found")]
    SlotNotFound,

    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_twelve_hour_times() {
        assert_eq!(
            parse_time_of_day("10:30 AM"),
            NaiveTime::from_hms_opt(10, 30, 0)
        );
        assert_eq!(
            parse_time_of_day("12:15 PM"),
            NaiveTime::from_hms_opt(12, 15, 0)
        );
        assert_eq!(
            parse_time_of_day("12:05 am"),
            NaiveTime::from_hms_opt(0, 5, 0)
        );
    }

    #[test]
    fn parses_twenty_four_hour_times() {
        assert_eq!(
            parse_time_of_day("22:30"),
            NaiveTime::from_hms_opt(22, 30, 0)
        );
        assert_eq!(parse_time_of_day("09:00"), NaiveTime::from_hms_opt(9, 0, 0));
    }

    #[test]
    fn rejects_garbage_times() {
        assert_eq!(parse_time_of_day("half past ten"), None);
        assert_eq!(parse_time_of_day("25:00"), None);
        assert_eq!(parse_time_of_day(""), None);
    }

    #[test]
    fn end_instant_combines_date_and_time() {
        let slot = TimeSlot {
            slot_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            start_time: "10:00 AM".to_string(),
            end_time: "10:30 AM".to_string(),
            is_booked: false,
        };
        let expected = NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
            .and_utc();
        assert_eq!(slot.end_instant(), Some(expected));
    }

    #[test]
    fn end_instant_is_none_for_unparseable_time() {
        let slot = TimeSlot {
            slot_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            start_time: "10:00".to_string(),
            end_time: "whenever".to_string(),
            is_booked: false,
        };
        assert_eq!(slot.end_instant(), None);
    }
}
