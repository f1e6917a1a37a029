//! Booking lifecycle tests: creation constraints, the full path from
//! creation to completion and rating, and cancellation semantics.

mod common;

use uuid::Uuid;

use server_core::common::error::AppError;
use server_core::common::types::{Actor, GeoPoint};
use server_core::domains::bookings::actions::{
    accept_booking, approve_services, cancel_booking, complete_service, create_booking,
    mark_en_route, rate_booking, reject_booking, start_inspection, submit_diagnosis,
    ApprovalRequest, CancelRequest, DiagnosisRequest, RatingRequest,
};
use server_core::domains::bookings::actions::submit_diagnosis::ServiceItemRequest;
use server_core::domains::bookings::models::{Booking, ServiceItem};
use server_core::domains::bookings::BookingState;
use server_core::kernel::{BaseBookingStore, BaseVendorDirectory};

use common::{booking_request, env, vendor_at, wait_until};

async fn fetch(env: &common::TestEnv, id: Uuid) -> Booking {
    env.store.find_booking(id).await.unwrap().unwrap()
}

fn diagnosis_request() -> DiagnosisRequest {
    DiagnosisRequest {
        issues: vec![
            "Battery holds no charge".to_string(),
            "Corroded terminals".to_string(),
        ],
        services: vec![
            ServiceItemRequest {
                service_id: None,
                custom_name: Some("Battery replacement".to_string()),
                quoted_price: 4500.0,
            },
            ServiceItemRequest {
                service_id: Some(Uuid::new_v4()),
                custom_name: None,
                quoted_price: 800.0,
            },
            ServiceItemRequest {
                service_id: None,
                custom_name: Some("Terminal cleaning".to_string()),
                quoted_price: 150.0,
            },
        ],
    }
}

/// Create a booking and walk it to `VENDOR_ASSIGNED` through a real
/// dispatch cycle with one nearby vendor.
async fn assigned_booking(env: &common::TestEnv) -> (Booking, Uuid, Uuid) {
    let vendor = vendor_at(0.01);
    let vendor_id = vendor.id;
    env.directory.insert_vendor(vendor);

    let customer_id = Uuid::new_v4();
    let booking = create_booking(env.deps.clone(), customer_id, booking_request())
        .await
        .unwrap();
    assert_eq!(booking.state, BookingState::Created);

    assert!(wait_until(|| async { !env.notifier.offers().is_empty() }).await);
    let booking = accept_booking(env.deps.clone(), booking.id, vendor_id)
        .await
        .unwrap();
    (booking, customer_id, vendor_id)
}

#[tokio::test]
async fn test_second_ongoing_booking_is_rejected() {
    let env = env();
    let customer_id = Uuid::new_v4();
    create_booking(env.deps.clone(), customer_id, booking_request())
        .await
        .unwrap();

    // Rejected up front like any other invalid create
    let second = create_booking(env.deps.clone(), customer_id, booking_request()).await;
    assert!(matches!(second, Err(AppError::Validation(_))));

    // A different customer is unaffected
    assert!(
        create_booking(env.deps.clone(), Uuid::new_v4(), booking_request())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_invalid_coordinates_rejected_before_any_write() {
    let env = env();
    let mut request = booking_request();
    request.location = GeoPoint::new(200.0, 12.97);

    let result = create_booking(env.deps.clone(), Uuid::new_v4(), request).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_full_lifecycle_to_completion_and_rating() {
    let env = env();
    let (booking, customer_id, vendor_id) = assigned_booking(&env).await;

    let booking = mark_en_route(env.deps.clone(), booking.id, vendor_id)
        .await
        .unwrap();
    assert_eq!(booking.state, BookingState::VendorEnRoute);

    let booking = start_inspection(env.deps.clone(), booking.id, vendor_id)
        .await
        .unwrap();
    assert_eq!(booking.state, BookingState::InspectionInProgress);

    let booking = submit_diagnosis(env.deps.clone(), booking.id, vendor_id, diagnosis_request())
        .await
        .unwrap();
    assert_eq!(booking.state, BookingState::WaitingForUserApproval);
    assert_eq!(booking.diagnosis.as_ref().unwrap().suggested_services.len(), 3);

    // Approve the first and third items, reject the middle one
    let booking = approve_services(
        env.deps.clone(),
        booking.id,
        customer_id,
        ApprovalRequest {
            approved_indexes: vec![0, 2],
            rejected_indexes: vec![1],
        },
    )
    .await
    .unwrap();
    assert_eq!(booking.state, BookingState::ServiceInProgress);
    let execution = booking.service_execution.as_ref().unwrap();
    assert_eq!(execution.final_services.len(), 2);
    assert_eq!(execution.final_services[0].final_price, 4500.0);
    assert_eq!(execution.final_services[1].final_price, 150.0);
    assert!(matches!(
        execution.final_services[1].item,
        ServiceItem::Custom { .. }
    ));
    assert!(execution.completed_at.is_none());

    let booking = complete_service(env.deps.clone(), booking.id, vendor_id)
        .await
        .unwrap();
    assert_eq!(booking.state, BookingState::Completed);
    assert!(booking
        .service_execution
        .as_ref()
        .unwrap()
        .completed_at
        .is_some());

    // Vendor is released and credited
    let vendor = env.directory.find_vendor(vendor_id).await.unwrap().unwrap();
    assert!(vendor.active_booking_id.is_none());
    assert_eq!(env.directory.behavior(vendor_id).services_completed, 1);

    rate_booking(
        env.deps.clone(),
        booking.id,
        customer_id,
        RatingRequest { rating: 5 },
    )
    .await
    .unwrap();
    let behavior = env.directory.behavior(vendor_id);
    assert_eq!(behavior.rating_count, 1);
    assert_eq!(behavior.rating_sum, 5.0);

    // Terminal state frees the customer for a new booking
    assert!(
        create_booking(env.deps.clone(), customer_id, booking_request())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_inspection_may_start_straight_from_assignment() {
    let env = env();
    let (booking, _, vendor_id) = assigned_booking(&env).await;

    let booking = start_inspection(env.deps.clone(), booking.id, vendor_id)
        .await
        .unwrap();
    assert_eq!(booking.state, BookingState::InspectionInProgress);
}

#[tokio::test]
async fn test_wrong_vendor_cannot_progress_the_booking() {
    let env = env();
    let (booking, _, _) = assigned_booking(&env).await;

    let intruder = vendor_at(0.02);
    let intruder_id = intruder.id;
    env.directory.insert_vendor(intruder);

    let result = mark_en_route(env.deps.clone(), booking.id, intruder_id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(
        fetch(&env, booking.id).await.state,
        BookingState::VendorAssigned
    );
}

#[tokio::test]
async fn test_approval_requires_the_owning_customer() {
    let env = env();
    let (booking, _, vendor_id) = assigned_booking(&env).await;
    start_inspection(env.deps.clone(), booking.id, vendor_id)
        .await
        .unwrap();
    submit_diagnosis(env.deps.clone(), booking.id, vendor_id, diagnosis_request())
        .await
        .unwrap();

    let result = approve_services(
        env.deps.clone(),
        booking.id,
        Uuid::new_v4(),
        ApprovalRequest {
            approved_indexes: vec![0],
            rejected_indexes: vec![],
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_wrong_state_diagnosis_and_approval_read_as_not_found() {
    let env = env();
    // Assigned but no inspection under way: nothing to diagnose or approve
    let (booking, customer_id, vendor_id) = assigned_booking(&env).await;

    let diagnosis = submit_diagnosis(
        env.deps.clone(),
        booking.id,
        vendor_id,
        diagnosis_request(),
    )
    .await;
    assert!(matches!(diagnosis, Err(AppError::NotFound(_))));

    let approval = approve_services(
        env.deps.clone(),
        booking.id,
        customer_id,
        ApprovalRequest {
            approved_indexes: vec![0],
            rejected_indexes: vec![],
        },
    )
    .await;
    assert!(matches!(approval, Err(AppError::NotFound(_))));

    assert_eq!(
        fetch(&env, booking.id).await.state,
        BookingState::VendorAssigned
    );
}

#[tokio::test]
async fn test_system_actor_can_cancel() {
    let env = env();
    let (booking, _, _) = assigned_booking(&env).await;

    let cancelled = cancel_booking(
        env.deps.clone(),
        booking.id,
        CancelRequest {
            actor: Actor::System,
            reason: "operational shutdown".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(cancelled.state, BookingState::Cancelled);
    assert_eq!(
        cancelled.cancellation.as_ref().unwrap().actor,
        Actor::System
    );
}

#[tokio::test]
async fn test_cancellation_is_terminal_and_releases_the_vendor() {
    let env = env();
    let (booking, _, vendor_id) = assigned_booking(&env).await;

    let cancelled = cancel_booking(
        env.deps.clone(),
        booking.id,
        CancelRequest {
            actor: Actor::Customer,
            reason: "no longer needed".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(cancelled.state, BookingState::Cancelled);
    // The vendor reference survives cancellation
    assert_eq!(cancelled.vendor_id, Some(vendor_id));

    let vendor = env.directory.find_vendor(vendor_id).await.unwrap().unwrap();
    assert!(vendor.active_booking_id.is_none());
    assert_eq!(
        env.directory
            .behavior(vendor_id)
            .requests_cancelled_by_customer,
        1
    );

    // A second cancel is a conflict, not a double write
    let again = cancel_booking(
        env.deps.clone(),
        booking.id,
        CancelRequest {
            actor: Actor::Customer,
            reason: "changed my mind twice".to_string(),
        },
    )
    .await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_short_cancellation_reason_rejected() {
    let env = env();
    let (booking, _, _) = assigned_booking(&env).await;

    let result = cancel_booking(
        env.deps.clone(),
        booking.id,
        CancelRequest {
            actor: Actor::Customer,
            reason: "meh".to_string(),
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_rejection_only_feeds_the_counters() {
    let env = env();
    let (booking, _, vendor_id) = assigned_booking(&env).await;

    let bystander = vendor_at(0.03);
    let bystander_id = bystander.id;
    env.directory.insert_vendor(bystander);

    reject_booking(env.deps.clone(), booking.id, bystander_id)
        .await
        .unwrap();
    assert_eq!(env.directory.behavior(bystander_id).requests_rejected, 1);
    assert_eq!(
        fetch(&env, booking.id).await.vendor_id,
        Some(vendor_id)
    );
}

#[tokio::test]
async fn test_rating_requires_completion() {
    let env = env();
    let (booking, customer_id, _) = assigned_booking(&env).await;

    let result = rate_booking(
        env.deps.clone(),
        booking.id,
        customer_id,
        RatingRequest { rating: 4 },
    )
    .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let out_of_range = rate_booking(
        env.deps.clone(),
        booking.id,
        customer_id,
        RatingRequest { rating: 6 },
    )
    .await;
    assert!(matches!(out_of_range, Err(AppError::Validation(_))));
}
