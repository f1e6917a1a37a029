//! Cancellation, legal from any non-terminal state.
//!
//! A cancelled booking keeps its vendor reference and full history; the
//! vendor is released for new work, and a customer cancelling on an
//! assigned vendor feeds that vendor's cancelled-by-customer counter.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::common::types::Actor;
use crate::domains::bookings::models::{Booking, Cancellation};
use crate::kernel::deps::ServerDeps;

const MIN_REASON_LEN: usize = 5;

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub actor: Actor,
    pub reason: String,
}

pub async fn cancel_booking(
    deps: Arc<ServerDeps>,
    booking_id: Uuid,
    request: CancelRequest,
) -> Result<Booking, AppError> {
    if request.reason.trim().len() < MIN_REASON_LEN {
        return Err(AppError::Validation(format!(
            "cancellation reason must be at least {MIN_REASON_LEN} characters"
        )));
    }

    let actor = request.actor;
    let cancellation = Cancellation {
        actor,
        reason: request.reason,
        cancelled_at: Utc::now(),
    };
    let Some(booking) = deps
        .booking_store
        .record_cancellation(booking_id, cancellation)
        .await?
    else {
        return match deps.booking_store.find_booking(booking_id).await? {
            None => Err(AppError::NotFound("booking not found".to_string())),
            Some(_) => Err(AppError::Conflict(
                "booking is already in a terminal state".to_string(),
            )),
        };
    };

    if let Some(vendor_id) = booking.vendor_id {
        deps.vendor_directory
            .set_active_booking(vendor_id, None)
            .await?;
        if actor == Actor::Customer {
            deps.vendor_directory
                .record_cancelled_by_customer(vendor_id)
                .await?;
        }
    }

    tracing::info!(booking_id = %booking_id, ?actor, "booking cancelled");
    Ok(booking)
}
