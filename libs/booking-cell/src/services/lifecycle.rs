// libs/booking-cell/src/services/lifecycle.rs
//
// Pure state-machine rules for booking status. Every mutation path in the
// booking service funnels through these checks before touching storage.

use crate::models::{BookingError, BookingStatus, TreatmentStatus};

/// Whether a direct `from -> to` status transition is allowed.
/// `completed` and `cancelled` are terminal.
pub fn is_valid_transition(from: BookingStatus, to: BookingStatus) -> bool {
    use BookingStatus::*;
    matches!(
        (from, to),
        (Pending, Confirmed)
            | (Pending, Cancelled)
            | (Confirmed, Completed)
            | (Confirmed, Cancelled)
    )
}

/// Cancellation preconditions, with the exact refusal message surfaced to
/// callers.
pub fn check_cancellable(status: BookingStatus) -> Result<(), BookingError> {
    match status {
        BookingStatus::Cancelled => Err(BookingError::InvalidState(
            "Booking is already cancelled".to_string(),
        )),
        BookingStatus::Completed => Err(BookingError::InvalidState(
            "Cannot cancel a completed booking".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Only active bookings can be moved to a different slot.
pub fn check_reschedulable(status: BookingStatus) -> Result<(), BookingError> {
    if status.is_active() {
        Ok(())
    } else {
        Err(BookingError::InvalidState(format!(
            "Cannot reschedule a {} booking",
            status
        )))
    }
}

/// Marking a booking treated also completes it. `treated` is terminal:
/// once set it cannot go back to `untreated`. Returns the status the
/// booking should land on, or an error when the request would break the
/// state machine.
pub fn status_after_treatment(
    current: BookingStatus,
    current_treatment: TreatmentStatus,
    requested: TreatmentStatus,
) -> Result<BookingStatus, BookingError> {
    match requested {
        TreatmentStatus::Untreated => {
            if current_treatment == TreatmentStatus::Treated {
                return Err(BookingError::InvalidState(
                    "A treated booking cannot be reverted to untreated".to_string(),
                ));
            }
            Ok(current)
        }
        TreatmentStatus::Treated => match current {
            // Idempotent: re-marking a completed booking treated is fine.
            BookingStatus::Completed => Ok(BookingStatus::Completed),
            BookingStatus::Cancelled => Err(BookingError::InvalidState(
                "Cannot treat a cancelled booking".to_string(),
            )),
            _ => Ok(BookingStatus::Completed),
        },
    }
}
