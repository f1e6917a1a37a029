//! Mid-lifecycle vendor progress, rejection, and post-completion rating.
//!
//! En-route is optional: a vendor already on site may start the inspection
//! directly from `VENDOR_ASSIGNED`.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::common::types::Actor;
use crate::domains::bookings::models::Booking;
use crate::domains::bookings::state::BookingState;
use crate::kernel::deps::ServerDeps;

pub async fn mark_en_route(
    deps: Arc<ServerDeps>,
    booking_id: Uuid,
    vendor_id: Uuid,
) -> Result<Booking, AppError> {
    let transitioned = deps
        .booking_store
        .transition(
            booking_id,
            BookingState::VendorAssigned,
            BookingState::VendorEnRoute,
            Actor::Vendor,
            Some(vendor_id),
            Some("Vendor en route".to_string()),
        )
        .await?;
    require_transition(&deps, booking_id, transitioned).await
}

pub async fn start_inspection(
    deps: Arc<ServerDeps>,
    booking_id: Uuid,
    vendor_id: Uuid,
) -> Result<Booking, AppError> {
    // Try the en-route path first, then the direct hop from assignment
    for from in [BookingState::VendorEnRoute, BookingState::VendorAssigned] {
        if let Some(booking) = deps
            .booking_store
            .transition(
                booking_id,
                from,
                BookingState::InspectionInProgress,
                Actor::Vendor,
                Some(vendor_id),
                Some("Inspection started".to_string()),
            )
            .await?
        {
            return Ok(booking);
        }
    }
    require_transition(&deps, booking_id, None).await
}

pub async fn complete_service(
    deps: Arc<ServerDeps>,
    booking_id: Uuid,
    vendor_id: Uuid,
) -> Result<Booking, AppError> {
    let Some(booking) = deps
        .booking_store
        .record_completion(booking_id, vendor_id)
        .await?
    else {
        return require_transition(&deps, booking_id, None).await;
    };

    deps.vendor_directory
        .set_active_booking(vendor_id, None)
        .await?;
    deps.vendor_directory
        .record_service_completed(vendor_id)
        .await?;

    tracing::info!(booking_id = %booking_id, vendor_id = %vendor_id, "service completed");
    Ok(booking)
}

/// A vendor declining an offer. Purely advisory: escalation is driven by
/// the response window, so a rejection only feeds the behavior counters.
pub async fn reject_booking(
    deps: Arc<ServerDeps>,
    booking_id: Uuid,
    vendor_id: Uuid,
) -> Result<(), AppError> {
    if deps.vendor_directory.find_vendor(vendor_id).await?.is_none() {
        return Err(AppError::NotFound("vendor not found".to_string()));
    }
    deps.vendor_directory
        .record_request_rejected(vendor_id)
        .await?;
    tracing::info!(booking_id = %booking_id, vendor_id = %vendor_id, "offer rejected");
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: u8,
}

/// Post-completion rating by the booking's customer, 1 to 5 stars.
pub async fn rate_booking(
    deps: Arc<ServerDeps>,
    booking_id: Uuid,
    customer_id: Uuid,
    request: RatingRequest,
) -> Result<(), AppError> {
    if !(1..=5).contains(&request.rating) {
        return Err(AppError::Validation(
            "rating must be between 1 and 5".to_string(),
        ));
    }

    let Some(booking) = deps.booking_store.find_booking(booking_id).await? else {
        return Err(AppError::NotFound("booking not found".to_string()));
    };
    if booking.customer_id != customer_id {
        return Err(AppError::NotFound("booking not found".to_string()));
    }
    if booking.state != BookingState::Completed {
        return Err(AppError::NotFound(
            "only completed bookings can be rated".to_string(),
        ));
    }
    let Some(vendor_id) = booking.vendor_id else {
        return Err(AppError::NotFound("booking has no vendor".to_string()));
    };

    deps.vendor_directory
        .record_rating(vendor_id, request.rating)
        .await?;
    Ok(())
}

async fn require_transition(
    deps: &ServerDeps,
    booking_id: Uuid,
    transitioned: Option<Booking>,
) -> Result<Booking, AppError> {
    match transitioned {
        Some(booking) => Ok(booking),
        // Wrong state and wrong vendor both mean there is no booking to
        // act on from this caller's point of view
        None => match deps.booking_store.find_booking(booking_id).await? {
            None => Err(AppError::NotFound("booking not found".to_string())),
            Some(_) => Err(AppError::NotFound(
                "booking is not in a state that allows this action".to_string(),
            )),
        },
    }
}
