//! Shared harness for integration tests: in-memory dependencies wired into
//! `ServerDeps` with dispatch timing shrunk to test scale.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use server_core::common::types::{GeoPoint, ServiceCategory};
use server_core::config::DispatchConfig;
use server_core::domains::bookings::actions::CreateBookingRequest;
use server_core::domains::bookings::models::{NewBooking, ServiceAddress, VehicleInfo};
use server_core::domains::vendors::models::Vendor;
use server_core::kernel::test_dependencies::{
    InMemoryBookingStore, InMemoryVendorDirectory, RecordingNotifier,
};
use server_core::kernel::ServerDeps;

/// Service point every test positions vendors around
pub const BASE_LNG: f64 = 77.59;
pub const BASE_LAT: f64 = 12.97;

pub struct TestEnv {
    pub deps: Arc<ServerDeps>,
    pub store: Arc<InMemoryBookingStore>,
    pub directory: Arc<InMemoryVendorDirectory>,
    pub notifier: Arc<RecordingNotifier>,
}

/// Dispatch tuning scaled down so a full multi-wave cycle runs in well
/// under a second.
pub fn test_config() -> DispatchConfig {
    DispatchConfig {
        batch_size: 2,
        response_window: Duration::from_millis(100),
        initial_radius_km: 5.0,
        radius_increment_km: 5.0,
        max_radius_km: 10.0,
        stale_after: Duration::from_millis(200),
    }
}

pub fn env_with(config: DispatchConfig) -> TestEnv {
    let store = Arc::new(InMemoryBookingStore::new());
    let directory = Arc::new(InMemoryVendorDirectory::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let deps = Arc::new(ServerDeps::new(
        config,
        store.clone(),
        directory.clone(),
        notifier.clone(),
    ));
    TestEnv {
        deps,
        store,
        directory,
        notifier,
    }
}

pub fn env() -> TestEnv {
    env_with(test_config())
}

/// A verified, available battery-service vendor offset north of the base
/// point. 0.01 degrees of latitude is roughly 1.1 km.
pub fn vendor_at(lat_offset: f64) -> Vendor {
    let now = Utc::now();
    Vendor {
        id: Uuid::new_v4(),
        full_name: "Ravi Kumar".to_string(),
        shop_name: "Kumar Auto Works".to_string(),
        is_verified: true,
        is_available: true,
        lng: BASE_LNG,
        lat: BASE_LAT + lat_offset,
        service_categories: Json(vec![ServiceCategory::Battery]),
        active_booking_id: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn booking_request() -> CreateBookingRequest {
    CreateBookingRequest {
        service_categories: vec![ServiceCategory::Battery],
        problem_description: Some("car won't start, clicking sound".to_string()),
        vehicle: VehicleInfo {
            vehicle_type: "Car".to_string(),
            brand: "Maruti".to_string(),
            model: "Swift".to_string(),
        },
        location: GeoPoint::new(BASE_LNG, BASE_LAT),
        address: ServiceAddress {
            formatted_address: "1 MG Road".to_string(),
            landmark: Some("Opposite metro station".to_string()),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            pincode: "560001".to_string(),
        },
    }
}

/// Direct store input for tests that bypass the create action.
pub fn new_booking(customer_id: Uuid) -> NewBooking {
    let request = booking_request();
    NewBooking {
        customer_id,
        service_categories: request.service_categories,
        problem_description: request.problem_description,
        vehicle: request.vehicle,
        location: request.location,
        address: request.address,
        initial_radius_km: 5.0,
    }
}

/// Poll `condition` every 10 ms until it holds or 5 seconds pass.
pub async fn wait_until<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
