// libs/booking-cell/src/services/notify.rs
//
// Fire-and-forget notification rows. Delivery failures are logged and
// swallowed; no booking operation ever fails because a notification insert
// did.

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::Booking;

pub struct NotificationService {
    supabase: Arc<SupabaseClient>,
}

impl NotificationService {
    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn booking_confirmed(&self, booking: &Booking, auth_token: &str) {
        self.insert_rows(
            vec![
                self.row(
                    Some(booking.patient_id),
                    "booking_confirmed",
                    &format!(
                        "Your booking for {} at {} is confirmed",
                        booking.slot_date, booking.slot_time
                    ),
                    booking.id,
                ),
                self.row(
                    Some(booking.provider_id),
                    "booking_confirmed",
                    &format!(
                        "New booking for {} at {}",
                        booking.slot_date, booking.slot_time
                    ),
                    booking.id,
                ),
                // Admin broadcast row: no recipient, picked up by the back office.
                self.row(None, "booking_confirmed", "New booking created", booking.id),
            ],
            auth_token,
        )
        .await;
    }

    pub async fn booking_cancelled(&self, booking: &Booking, auth_token: &str) {
        self.insert_rows(
            vec![
                self.row(
                    Some(booking.patient_id),
                    "booking_cancelled",
                    &format!(
                        "Your booking for {} at {} was cancelled",
                        booking.slot_date, booking.slot_time
                    ),
                    booking.id,
                ),
                self.row(
                    Some(booking.provider_id),
                    "booking_cancelled",
                    &format!(
                        "Booking for {} at {} was cancelled",
                        booking.slot_date, booking.slot_time
                    ),
                    booking.id,
                ),
            ],
            auth_token,
        )
        .await;
    }

    pub async fn meeting_link_added(&self, booking: &Booking, auth_token: &str) {
        self.insert_rows(
            vec![self.row(
                Some(booking.patient_id),
                "meeting_link_added",
                "A meeting link was added to your booking",
                booking.id,
            )],
            auth_token,
        )
        .await;
    }

    pub async fn test_result_uploaded(&self, booking: &Booking, auth_token: &str) {
        self.insert_rows(
            vec![
                self.row(
                    Some(booking.patient_id),
                    "test_result_uploaded",
                    "A test result was added to your booking",
                    booking.id,
                ),
                self.row(
                    Some(booking.provider_id),
                    "test_result_uploaded",
                    "A test result was added to a booking",
                    booking.id,
                ),
            ],
            auth_token,
        )
        .await;
    }

    pub async fn payment_approved(&self, booking: &Booking, auth_token: &str) {
        self.insert_rows(
            vec![self.row(
                Some(booking.provider_id),
                "payment_approved",
                &format!("Your payout of {} was approved", booking.provider_share),
                booking.id,
            )],
            auth_token,
        )
        .await;
    }

    fn row(&self, recipient: Option<Uuid>, kind: &str, message: &str, booking_id: Uuid) -> Value {
        json!({
            "recipient_id": recipient,
            "kind": kind,
            "message": message,
            "booking_id": booking_id,
            "read": false,
            "created_at": Utc::now().to_rfc3339()
        })
    }

    async fn insert_rows(&self, rows: Vec<Value>, auth_token: &str) {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Result<Vec<Value>, _> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/notifications",
                Some(auth_token),
                Some(Value::Array(rows)),
                Some(headers),
            )
            .await;

        if let Err(e) = result {
            warn!("Failed to insert notifications: {}", e);
        }
    }
}
