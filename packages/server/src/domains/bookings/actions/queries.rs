//! Read-side booking lookups.

use std::sync::Arc;

use uuid::Uuid;

use crate::common::error::AppError;
use crate::domains::bookings::models::Booking;
use crate::kernel::deps::ServerDeps;

pub async fn get_booking(deps: Arc<ServerDeps>, booking_id: Uuid) -> Result<Booking, AppError> {
    deps.booking_store
        .find_booking(booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound("booking not found".to_string()))
}
