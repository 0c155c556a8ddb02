// libs/booking-cell/src/services/booking.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use provider_cell::models::parse_time_of_day;
use provider_cell::services::catalog::SlotCatalogService;

use crate::models::{
    Booking, BookingError, BookingStatus, CompleteReportRequest, CreateBookingRequest,
    MeetLinkRequest, RescheduleBookingRequest, ReviewRequest, TestResultRequest,
    TreatmentStatusRequest,
};
use crate::services::conflict::SlotConflictService;
use crate::services::lifecycle;
use crate::services::notify::NotificationService;
use crate::services::pricing;

/// The booking ledger. Rows in the `bookings` table are the source of truth
/// for who holds which slot; the catalog's `is_booked` flags are an advisory
/// cache that this service keeps up to date on a best-effort basis.
pub struct BookingService {
    supabase: Arc<SupabaseClient>,
    catalog: SlotCatalogService,
    conflict: SlotConflictService,
    notifier: NotificationService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            catalog: SlotCatalogService::with_client(supabase.clone()),
            conflict: SlotConflictService::with_client(supabase.clone()),
            notifier: NotificationService::with_client(supabase.clone()),
            supabase,
        }
    }

    // ==========================================================================
    // CREATION
    // ==========================================================================

    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        validate_create_request(&request)?;

        self.conflict
            .ensure_slot_claimable(
                request.provider_id,
                request.slot_date,
                &request.slot_time,
                None,
                auth_token,
            )
            .await?;

        // Monetary figures are frozen here; later price-table changes never
        // rewrite existing rows.
        let split = pricing::payment_split(request.service_type);

        let now = Utc::now();
        let booking_data = json!({
            "id": Uuid::new_v4(),
            "patient_id": request.patient_id,
            "provider_id": request.provider_id,
            "slot_date": request.slot_date,
            "slot_time": request.slot_time,
            "service_type": request.service_type,
            "status": BookingStatus::Confirmed,
            "treatment_status": "untreated",
            "payment_amount": split.payment_amount,
            "provider_share": split.provider_share,
            "provider_paid": false,
            "paid_at": null,
            "payment_id": request.payment_id,
            "patient_age": request.patient_details.age,
            "patient_sex": request.patient_details.sex,
            "prescription_url": request.patient_details.prescription_url,
            "meet_link": null,
            "test_result_urls": [],
            "review": null,
            "report_url": null,
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
                "/rest/v1/bookings",
                Some(auth_token),
                Some(booking_data),
                Some(headers),
            )
            .await
            .map_err(|e| {
                // The partial unique index on active (provider, date, time)
                // rows turns a lost race into a 409.
                if e.is_conflict() {
                    BookingError::SlotUnavailable
                } else {
                    BookingError::DatabaseError(e.to_string())
                }
            })?;

        let booking: Booking = parse_single(result, "Failed to create booking")?;

        // The ledger row already holds the claim; a failed flag update only
        // leaves the catalog cache stale, which the availability view
        // reconciles away.
        if let Err(e) = self
            .catalog
            .set_slot_booked(
                booking.provider_id,
                booking.slot_date,
                &booking.slot_time,
                true,
                auth_token,
            )
            .await
        {
            warn!(
                "Booking {} created but slot flag update failed: {}",
                booking.id, e
            );
        }

        self.notifier.booking_confirmed(&booking, auth_token).await;

        info!(
            "Booking {} created: provider {} on {} at {}",
            booking.id, booking.provider_id, booking.slot_date, booking.slot_time
        );
        Ok(booking)
    }

    // ==========================================================================
    // READS
    // ==========================================================================

    pub async fn get_booking(
        &self,
        booking_id: Uuid,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let path = format!("/rest/v1/bookings?id=eq.{}", booking_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(BookingError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse booking: {}", e)))
    }

    pub async fn list_patient_bookings(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Booking>, BookingError> {
        self.list_bookings(&format!("patient_id=eq.{}", patient_id), auth_token)
            .await
    }

    pub async fn list_provider_bookings(
        &self,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Booking>, BookingError> {
        self.list_bookings(&format!("provider_id=eq.{}", provider_id), auth_token)
            .await
    }

    async fn list_bookings(
        &self,
        filter: &str,
        auth_token: &str,
    ) -> Result<Vec<Booking>, BookingError> {
        let path = format!("/rest/v1/bookings?{}&order=created_at.desc", filter);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(|row| {
                serde_json::from_value(row).map_err(|e| {
                    BookingError::DatabaseError(format!("Failed to parse booking: {}", e))
                })
            })
            .collect()
    }

    // ==========================================================================
    // LIFECYCLE
    // ==========================================================================

    /// Cancel an active booking and release its slot. Only the booking's
    /// patient or its provider may cancel.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let booking = self.get_booking(booking_id, auth_token).await?;

        if !is_patient_of(user, &booking) && !is_provider_of(user, &booking) {
            return Err(BookingError::Forbidden(
                "Only the booking's patient or provider can cancel it".to_string(),
            ));
        }

        lifecycle::check_cancellable(booking.status)?;

        let updated = self
            .patch_booking(booking_id, json!({ "status": BookingStatus::Cancelled }), auth_token)
            .await?;

        // Release unconditionally; a missing catalog entry is fine.
        if let Err(e) = self
            .catalog
            .set_slot_booked(
                updated.provider_id,
                updated.slot_date,
                &updated.slot_time,
                false,
                auth_token,
            )
            .await
        {
            warn!(
                "Booking {} cancelled but slot release failed: {}",
                booking_id, e
            );
        }

        self.notifier.booking_cancelled(&updated, auth_token).await;

        info!("Booking {} cancelled", booking_id);
        Ok(updated)
    }

    /// Move an active booking to a different slot on the same provider.
    /// Every check runs before any write, so a refused reschedule leaves
    /// both the ledger and the catalog untouched.
    pub async fn reschedule_booking(
        &self,
        booking_id: Uuid,
        request: RescheduleBookingRequest,
        user: &User,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        if parse_time_of_day(&request.new_time).is_none() {
            return Err(BookingError::InvalidInput(format!(
                "Unparseable slot time: {}",
                request.new_time
            )));
        }

        let booking = self.get_booking(booking_id, auth_token).await?;

        if !is_provider_of(user, &booking) {
            return Err(BookingError::Forbidden(
                "Only the booking's provider can reschedule it".to_string(),
            ));
        }

        lifecycle::check_reschedulable(booking.status)?;

        self.conflict
            .ensure_slot_claimable(
                booking.provider_id,
                request.new_date,
                &request.new_time,
                Some(booking_id),
                auth_token,
            )
            .await?;

        // Ledger first: once the row moves, the claim has moved. Flag
        // updates after this are best-effort cache maintenance.
        let updated = self
            .patch_booking(
                booking_id,
                json!({
                    "slot_date": request.new_date,
                    "slot_time": request.new_time
                }),
                auth_token,
            )
            .await?;

        if let Err(e) = self
            .catalog
            .set_slot_booked(
                booking.provider_id,
                booking.slot_date,
                &booking.slot_time,
                false,
                auth_token,
            )
            .await
        {
            warn!(
                "Booking {} rescheduled but old slot release failed: {}",
                booking_id, e
            );
        }
        if let Err(e) = self
            .catalog
            .set_slot_booked(
                updated.provider_id,
                updated.slot_date,
                &updated.slot_time,
                true,
                auth_token,
            )
            .await
        {
            warn!(
                "Booking {} rescheduled but new slot claim flag failed: {}",
                booking_id, e
            );
        }

        info!(
            "Booking {} rescheduled to {} at {}",
            booking_id, updated.slot_date, updated.slot_time
        );
        Ok(updated)
    }

    /// Update treatment status. Marking a booking treated also completes it.
    pub async fn set_treatment_status(
        &self,
        booking_id: Uuid,
        request: TreatmentStatusRequest,
        user: &User,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let booking = self.get_booking(booking_id, auth_token).await?;
        ensure_provider_or_admin(user, &booking)?;

        let new_status = lifecycle::status_after_treatment(
            booking.status,
            booking.treatment_status,
            request.treatment_status,
        )?;

        self.patch_booking(
            booking_id,
            json!({
                "treatment_status": request.treatment_status,
                "status": new_status
            }),
            auth_token,
        )
        .await
    }

    /// Attach the final report and complete the booking in one step.
    pub async fn complete_with_report(
        &self,
        booking_id: Uuid,
        request: CompleteReportRequest,
        user: &User,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        if request.report_url.trim().is_empty() {
            return Err(BookingError::InvalidInput(
                "Report URL cannot be empty".to_string(),
            ));
        }

        let booking = self.get_booking(booking_id, auth_token).await?;
        ensure_provider_or_admin(user, &booking)?;

        if !lifecycle::is_valid_transition(booking.status, BookingStatus::Completed) {
            return Err(BookingError::InvalidState(format!(
                "Cannot complete a {} booking",
                booking.status
            )));
        }

        // Filing a report completes the booking on its own; treatment
        // status is a separate track and stays whatever it was.
        self.patch_booking(
            booking_id,
            json!({
                "report_url": request.report_url,
                "status": BookingStatus::Completed
            }),
            auth_token,
        )
        .await
    }

    /// Attach a video-meeting link. Only meaningful while the booking is
    /// still confirmed.
    pub async fn set_meet_link(
        &self,
        booking_id: Uuid,
        request: MeetLinkRequest,
        user: &User,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        if request.meet_link.trim().is_empty() {
            return Err(BookingError::InvalidInput(
                "Meeting link cannot be empty".to_string(),
            ));
        }

        let booking = self.get_booking(booking_id, auth_token).await?;
        ensure_provider_or_admin(user, &booking)?;

        if booking.status != BookingStatus::Confirmed {
            return Err(BookingError::InvalidState(format!(
                "Cannot attach a meeting link to a {} booking",
                booking.status
            )));
        }

        let updated = self
            .patch_booking(booking_id, json!({ "meet_link": request.meet_link }), auth_token)
            .await?;

        self.notifier.meeting_link_added(&updated, auth_token).await;
        Ok(updated)
    }

    /// Append a test-result URL. Either party on the booking may upload.
    pub async fn append_test_result(
        &self,
        booking_id: Uuid,
        request: TestResultRequest,
        user: &User,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        if request.url.trim().is_empty() {
            return Err(BookingError::InvalidInput(
                "Test result URL cannot be empty".to_string(),
            ));
        }

        let booking = self.get_booking(booking_id, auth_token).await?;

        if !is_patient_of(user, &booking) && !is_provider_of(user, &booking) && !user.is_admin() {
            return Err(BookingError::Forbidden(
                "Only the booking's patient or provider can upload test results".to_string(),
            ));
        }

        let mut urls = booking.test_result_urls.clone();
        urls.push(request.url);

        let updated = self
            .patch_booking(booking_id, json!({ "test_result_urls": urls }), auth_token)
            .await?;

        self.notifier.test_result_uploaded(&updated, auth_token).await;
        Ok(updated)
    }

    /// Leave a one-time review on a completed booking. Patient only.
    pub async fn set_review(
        &self,
        booking_id: Uuid,
        request: ReviewRequest,
        user: &User,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        if request.review.trim().is_empty() {
            return Err(BookingError::InvalidInput(
                "Review cannot be empty".to_string(),
            ));
        }

        let booking = self.get_booking(booking_id, auth_token).await?;

        if !is_patient_of(user, &booking) {
            return Err(BookingError::Forbidden(
                "Only the booking's patient can leave a review".to_string(),
            ));
        }
        if booking.status != BookingStatus::Completed {
            return Err(BookingError::InvalidState(
                "Reviews can only be left on completed bookings".to_string(),
            ));
        }
        if booking.review.is_some() {
            return Err(BookingError::InvalidState(
                "This booking already has a review".to_string(),
            ));
        }

        self.patch_booking(booking_id, json!({ "review": request.review }), auth_token)
            .await
    }

    /// Mark the provider's share paid out. Admin only; the share itself is
    /// never recomputed here.
    pub async fn mark_provider_paid(
        &self,
        booking_id: Uuid,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        let booking = self.get_booking(booking_id, auth_token).await?;

        if booking.provider_paid {
            return Err(BookingError::InvalidState(
                "Provider has already been paid for this booking".to_string(),
            ));
        }

        let updated = self
            .patch_booking(
                booking_id,
                json!({
                    "provider_paid": true,
                    "paid_at": Utc::now().to_rfc3339()
                }),
                auth_token,
            )
            .await?;

        self.notifier.payment_approved(&updated, auth_token).await;

        info!(
            "Provider payout of {} approved for booking {}",
            updated.provider_share, booking_id
        );
        Ok(updated)
    }

    // ==========================================================================
    // STORAGE HELPERS
    // ==========================================================================

    async fn patch_booking(
        &self,
        booking_id: Uuid,
        mut update: Value,
        auth_token: &str,
    ) -> Result<Booking, BookingError> {
        if let Some(map) = update.as_object_mut() {
            map.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        let path = format!("/rest/v1/bookings?id=eq.{}", booking_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(update), Some(headers))
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    BookingError::SlotUnavailable
                } else {
                    BookingError::DatabaseError(e.to_string())
                }
            })?;

        if result.is_empty() {
            return Err(BookingError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse booking: {}", e)))
    }
}

fn validate_create_request(request: &CreateBookingRequest) -> Result<(), BookingError> {
    if !(1..=120).contains(&request.patient_details.age) {
        return Err(BookingError::InvalidInput(
            "Patient age must be between 1 and 120".to_string(),
        ));
    }
    if request.patient_details.sex.trim().is_empty() {
        return Err(BookingError::InvalidInput(
            "Patient sex is required".to_string(),
        ));
    }
    if request.patient_details.prescription_url.trim().is_empty() {
        return Err(BookingError::InvalidInput(
            "Prescription URL is required".to_string(),
        ));
    }
    if request.payment_id.trim().is_empty() {
        return Err(BookingError::InvalidInput(
            "Payment ID is required".to_string(),
        ));
    }
    if parse_time_of_day(&request.slot_time).is_none() {
        return Err(BookingError::InvalidInput(format!(
            "Unparseable slot time: {}",
            request.slot_time
        )));
    }
    Ok(())
}

fn is_patient_of(user: &User, booking: &Booking) -> bool {
    user.id == booking.patient_id.to_string()
}

fn is_provider_of(user: &User, booking: &Booking) -> bool {
    user.id == booking.provider_id.to_string()
}

fn ensure_provider_or_admin(user: &User, booking: &Booking) -> Result<(), BookingError> {
    if is_provider_of(user, booking) || user.is_admin() {
        Ok(())
    } else {
        Err(BookingError::Forbidden(
            "Only the booking's provider can do this".to_string(),
        ))
    }
}

fn parse_single(result: Vec<Value>, context: &str) -> Result<Booking, BookingError> {
    result
        .first()
        .cloned()
        .ok_or_else(|| BookingError::DatabaseError(context.to_string()))
        .and_then(|row| {
            serde_json::from_value(row)
                .map_err(|e| BookingError::DatabaseError(format!("Failed to parse booking: {}", e)))
        })
}
