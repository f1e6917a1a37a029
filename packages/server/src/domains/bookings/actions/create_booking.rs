//! Booking creation: validate, persist, kick off dispatch.
//!
//! The caller gets the booking back as soon as it is durably `CREATED`;
//! the dispatch cycle runs on its own task and reports through state.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::common::types::{GeoPoint, ServiceCategory};
use crate::domains::bookings::models::{Booking, NewBooking, ServiceAddress, VehicleInfo};
use crate::domains::dispatch::spawn_dispatch;
use crate::kernel::deps::ServerDeps;

const MAX_DESCRIPTION_LEN: usize = 500;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub service_categories: Vec<ServiceCategory>,
    pub problem_description: Option<String>,
    pub vehicle: VehicleInfo,
    pub location: GeoPoint,
    pub address: ServiceAddress,
}

pub async fn create_booking(
    deps: Arc<ServerDeps>,
    customer_id: Uuid,
    request: CreateBookingRequest,
) -> Result<Booking, AppError> {
    validate(&request)?;

    let booking = deps
        .booking_store
        .insert_booking(NewBooking {
            customer_id,
            service_categories: request.service_categories,
            problem_description: request.problem_description,
            vehicle: request.vehicle,
            location: request.location,
            address: request.address,
            initial_radius_km: deps.dispatch_config.initial_radius_km,
        })
        .await?;

    tracing::info!(booking_id = %booking.id, customer_id = %customer_id, "booking created");
    spawn_dispatch(deps, booking.id);
    Ok(booking)
}

fn validate(request: &CreateBookingRequest) -> Result<(), AppError> {
    if request.service_categories.is_empty() {
        return Err(AppError::Validation(
            "at least one service category is required".to_string(),
        ));
    }
    request.location.validate()?;

    if let Some(description) = &request.problem_description {
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(AppError::Validation(format!(
                "problem description exceeds {MAX_DESCRIPTION_LEN} characters"
            )));
        }
    }

    let vehicle = &request.vehicle;
    if vehicle.vehicle_type.trim().is_empty()
        || vehicle.brand.trim().is_empty()
        || vehicle.model.trim().is_empty()
    {
        return Err(AppError::Validation(
            "vehicle type, brand and model are required".to_string(),
        ));
    }

    let address = &request.address;
    if address.formatted_address.trim().is_empty()
        || address.city.trim().is_empty()
        || address.state.trim().is_empty()
        || address.pincode.trim().is_empty()
    {
        return Err(AppError::Validation(
            "address, city, state and pincode are required".to_string(),
        ));
    }

    Ok(())
}
