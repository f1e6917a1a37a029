//! Customer approval over the diagnosed line items.
//!
//! The decision is index-based against the recorded diagnosis and immutable
//! once taken. Approved items become the execution's final services with
//! their quoted prices copied verbatim; rejected items are dropped from
//! billing but stay visible in the diagnosis.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::domains::bookings::models::{
    Booking, FinalService, ServiceExecution, SuggestedService, UserApproval,
};
use crate::domains::bookings::state::BookingState;
use crate::kernel::deps::ServerDeps;

#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub approved_indexes: Vec<usize>,
    #[serde(default)]
    pub rejected_indexes: Vec<usize>,
}

pub async fn approve_services(
    deps: Arc<ServerDeps>,
    booking_id: Uuid,
    customer_id: Uuid,
    request: ApprovalRequest,
) -> Result<Booking, AppError> {
    let Some(booking) = deps.booking_store.find_booking(booking_id).await? else {
        return Err(AppError::NotFound("booking not found".to_string()));
    };
    if booking.customer_id != customer_id {
        return Err(AppError::NotFound("booking not found".to_string()));
    }
    if booking.state != BookingState::WaitingForUserApproval {
        return Err(AppError::NotFound(
            "booking is not waiting for approval".to_string(),
        ));
    }
    let Some(suggested) = booking.suggested_services() else {
        return Err(AppError::NotFound("no diagnosis on record".to_string()));
    };

    let final_services = select_final_services(suggested, &request)?;
    let now = Utc::now();
    let approval = UserApproval {
        approved_indexes: request.approved_indexes,
        rejected_indexes: request.rejected_indexes,
        decision_at: now,
    };
    let execution = ServiceExecution {
        started_at: now,
        completed_at: None,
        final_services,
    };

    let Some(updated) = deps
        .booking_store
        .record_approval(booking_id, customer_id, approval, execution)
        .await?
    else {
        // Guard lost between the read and the write
        return Err(AppError::NotFound(
            "booking is not waiting for approval".to_string(),
        ));
    };

    tracing::info!(booking_id = %booking_id, "services approved, execution started");
    Ok(updated)
}

fn select_final_services(
    suggested: &[SuggestedService],
    request: &ApprovalRequest,
) -> Result<Vec<FinalService>, AppError> {
    if request.approved_indexes.is_empty() {
        return Err(AppError::Validation(
            "at least one service must be approved".to_string(),
        ));
    }

    let approved: HashSet<usize> = request.approved_indexes.iter().copied().collect();
    let rejected: HashSet<usize> = request.rejected_indexes.iter().copied().collect();
    if let Some(index) = approved.union(&rejected).find(|&&i| i >= suggested.len()) {
        return Err(AppError::Validation(format!(
            "service index {index} is out of range"
        )));
    }
    if approved.intersection(&rejected).next().is_some() {
        return Err(AppError::Validation(
            "a service cannot be both approved and rejected".to_string(),
        ));
    }

    // Quoted prices are locked in at approval; execution order follows the
    // diagnosis order, not the request order
    Ok(suggested
        .iter()
        .enumerate()
        .filter(|(i, _)| approved.contains(i))
        .map(|(_, s)| FinalService {
            item: s.item.clone(),
            final_price: s.quoted_price,
        })
        .collect())
}
