//! Booking REST handlers.
//!
//! Principals arrive as `x-customer-id` / `x-vendor-id` headers; upstream
//! authentication is a gateway concern. Handlers stay thin: parse the
//! principal, delegate to the action, map the domain result.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    Json,
};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::common::types::Actor;
use crate::domains::bookings::actions::{
    accept_booking, approve_services, cancel_booking, complete_service, create_booking,
    get_booking, mark_en_route, rate_booking, reject_booking, start_inspection, submit_diagnosis,
    ApprovalRequest, CancelRequest, CreateBookingRequest, DiagnosisRequest, RatingRequest,
};
use crate::domains::bookings::models::Booking;
use crate::server::app::AppState;

const CUSTOMER_HEADER: &str = "x-customer-id";
const VENDOR_HEADER: &str = "x-vendor-id";

fn principal(headers: &HeaderMap, name: &str) -> Result<Uuid, AppError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| AppError::Validation(format!("missing or invalid {name} header")))
}

pub async fn create_booking_handler(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let customer_id = principal(&headers, CUSTOMER_HEADER)?;
    let booking = create_booking(state.deps, customer_id, request).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn get_booking_handler(
    Extension(state): Extension<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(get_booking(state.deps, booking_id).await?))
}

pub async fn accept_handler(
    Extension(state): Extension<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Booking>, AppError> {
    let vendor_id = principal(&headers, VENDOR_HEADER)?;
    Ok(Json(accept_booking(state.deps, booking_id, vendor_id).await?))
}

pub async fn reject_handler(
    Extension(state): Extension<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let vendor_id = principal(&headers, VENDOR_HEADER)?;
    reject_booking(state.deps, booking_id, vendor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn en_route_handler(
    Extension(state): Extension<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Booking>, AppError> {
    let vendor_id = principal(&headers, VENDOR_HEADER)?;
    Ok(Json(mark_en_route(state.deps, booking_id, vendor_id).await?))
}

pub async fn start_inspection_handler(
    Extension(state): Extension<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Booking>, AppError> {
    let vendor_id = principal(&headers, VENDOR_HEADER)?;
    Ok(Json(start_inspection(state.deps, booking_id, vendor_id).await?))
}

pub async fn diagnosis_handler(
    Extension(state): Extension<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<DiagnosisRequest>,
) -> Result<Json<Booking>, AppError> {
    let vendor_id = principal(&headers, VENDOR_HEADER)?;
    Ok(Json(
        submit_diagnosis(state.deps, booking_id, vendor_id, request).await?,
    ))
}

pub async fn approve_services_handler(
    Extension(state): Extension<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<ApprovalRequest>,
) -> Result<Json<Booking>, AppError> {
    let customer_id = principal(&headers, CUSTOMER_HEADER)?;
    Ok(Json(
        approve_services(state.deps, booking_id, customer_id, request).await?,
    ))
}

pub async fn complete_handler(
    Extension(state): Extension<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Booking>, AppError> {
    let vendor_id = principal(&headers, VENDOR_HEADER)?;
    Ok(Json(complete_service(state.deps, booking_id, vendor_id).await?))
}

pub async fn rate_handler(
    Extension(state): Extension<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<RatingRequest>,
) -> Result<StatusCode, AppError> {
    let customer_id = principal(&headers, CUSTOMER_HEADER)?;
    rate_booking(state.deps, booking_id, customer_id, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Cancellation names its actor in the body; the actor must be backed by
/// the matching principal header. SYSTEM cancellations come from internal
/// callers behind the gateway and carry no principal.
pub async fn cancel_handler(
    Extension(state): Extension<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<CancelRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = get_booking(state.deps.clone(), booking_id).await?;

    match request.actor {
        Actor::Customer => {
            let customer_id = principal(&headers, CUSTOMER_HEADER)?;
            if booking.customer_id != customer_id {
                return Err(AppError::NotFound("booking not found".to_string()));
            }
        }
        Actor::Vendor => {
            let vendor_id = principal(&headers, VENDOR_HEADER)?;
            if booking.vendor_id != Some(vendor_id) {
                return Err(AppError::Conflict(
                    "vendor is not assigned to this booking".to_string(),
                ));
            }
        }
        Actor::System => {}
    }

    Ok(Json(cancel_booking(state.deps, booking_id, request).await?))
}
