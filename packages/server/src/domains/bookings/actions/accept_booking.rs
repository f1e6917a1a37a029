//! Vendor acceptance: the race every offered vendor may enter.
//!
//! Binding goes through the store's compare-and-set, so under any number of
//! concurrent accepts exactly one vendor wins; the rest get `Conflict` and
//! no counter or active-booking write happens for them.

use std::sync::Arc;

use uuid::Uuid;

use crate::common::error::AppError;
use crate::domains::bookings::models::Booking;
use crate::kernel::deps::ServerDeps;

pub async fn accept_booking(
    deps: Arc<ServerDeps>,
    booking_id: Uuid,
    vendor_id: Uuid,
) -> Result<Booking, AppError> {
    if deps.vendor_directory.find_vendor(vendor_id).await?.is_none() {
        return Err(AppError::NotFound("vendor not found".to_string()));
    }

    let Some(booking) = deps.booking_store.bind_vendor(booking_id, vendor_id).await? else {
        return match deps.booking_store.find_booking(booking_id).await? {
            None => Err(AppError::NotFound("booking not found".to_string())),
            Some(_) => Err(AppError::Conflict(
                "booking is no longer available".to_string(),
            )),
        };
    };

    // Side effects only on the winning path
    deps.vendor_directory
        .set_active_booking(vendor_id, Some(booking_id))
        .await?;
    deps.vendor_directory
        .record_request_accepted(vendor_id)
        .await?;

    tracing::info!(booking_id = %booking_id, vendor_id = %vendor_id, "vendor assigned");
    Ok(booking)
}
