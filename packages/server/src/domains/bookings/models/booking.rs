//! Booking document - SQL persistence layer.
//!
//! A booking is the unit of work: one customer's service request and its
//! full lifecycle record. Nested documents (history, dispatch progress,
//! diagnosis, approval, execution, cancellation) live in JSONB columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::common::types::{Actor, GeoPoint, ServiceCategory};
use crate::domains::bookings::state::BookingState;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// Bound vendor; null until assignment, retained through cancellation
    pub vendor_id: Option<Uuid>,

    pub service_categories: Json<Vec<ServiceCategory>>,
    pub problem_description: Option<String>,
    pub vehicle: Json<VehicleInfo>,

    // Service location
    pub lng: f64,
    pub lat: f64,
    pub address: Json<ServiceAddress>,

    /// Current dispatch search radius; monotonically non-decreasing
    pub dispatch_radius_km: f64,

    pub state: BookingState,
    /// Append-only transition log; never rewritten
    pub state_history: Json<Vec<StateHistoryEntry>>,
    /// Present only while dispatching; cleared when the radius expands
    pub dispatch_meta: Option<Json<DispatchMeta>>,

    pub diagnosis: Option<Json<Diagnosis>>,
    pub user_approval: Option<Json<UserApproval>>,
    pub service_execution: Option<Json<ServiceExecution>>,
    pub cancellation: Option<Json<Cancellation>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Build a fresh `CREATED` booking from validated input.
    pub fn create(new: NewBooking) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_id: new.customer_id,
            vendor_id: None,
            service_categories: Json(new.service_categories),
            problem_description: new.problem_description,
            vehicle: Json(new.vehicle),
            lng: new.location.lng,
            lat: new.location.lat,
            address: Json(new.address),
            dispatch_radius_km: new.initial_radius_km,
            state: BookingState::Created,
            state_history: Json(vec![StateHistoryEntry::new(
                BookingState::Created,
                Actor::Customer,
                Some("Booking created".to_string()),
            )]),
            dispatch_meta: None,
            diagnosis: None,
            user_approval: None,
            service_execution: None,
            cancellation: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lng, self.lat)
    }

    /// Suggested line items of the recorded diagnosis, if any
    pub fn suggested_services(&self) -> Option<&[SuggestedService]> {
        self.diagnosis
            .as_ref()
            .map(|d| d.suggested_services.as_slice())
    }
}

/// Validated input for booking creation
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub customer_id: Uuid,
    pub service_categories: Vec<ServiceCategory>,
    pub problem_description: Option<String>,
    pub vehicle: VehicleInfo,
    pub location: GeoPoint,
    pub address: ServiceAddress,
    pub initial_radius_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub vehicle_type: String,
    pub brand: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAddress {
    pub formatted_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

/// One entry of the append-only transition log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateHistoryEntry {
    pub state: BookingState,
    pub actor: Actor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

impl StateHistoryEntry {
    pub fn new(state: BookingState, actor: Actor, reason: Option<String>) -> Self {
        Self {
            state,
            actor,
            reason,
            at: Utc::now(),
        }
    }
}

/// Persisted progress of a dispatch cycle, written before every wait so a
/// restarted dispatcher can resume mid-wave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchMeta {
    /// Ranked vendor ids partitioned into offer batches
    pub vendor_batches: Vec<Vec<Uuid>>,
    pub current_batch_index: usize,
    pub last_dispatch_at: Option<DateTime<Utc>>,
}

/// A diagnosis line item: either a catalog service or a custom one named by
/// the vendor, each with a vendor-quoted price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceItem {
    Catalog { service_id: Uuid },
    Custom { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedService {
    #[serde(flatten)]
    pub item: ServiceItem,
    pub quoted_price: f64,
}

/// Vendor findings recorded once, at diagnosis submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub issues: Vec<String>,
    pub suggested_services: Vec<SuggestedService>,
}

/// The customer's decision over the suggested items; immutable once recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserApproval {
    pub approved_indexes: Vec<usize>,
    pub rejected_indexes: Vec<usize>,
    pub decision_at: DateTime<Utc>,
}

/// An approved line item with its locked price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalService {
    #[serde(flatten)]
    pub item: ServiceItem,
    pub final_price: f64,
}

/// The finalized, customer-approved work; the only billable set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceExecution {
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub final_services: Vec<FinalService>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cancellation {
    pub actor: Actor,
    pub reason: String,
    pub cancelled_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_new_booking() -> NewBooking {
        NewBooking {
            customer_id: Uuid::new_v4(),
            service_categories: vec![ServiceCategory::Battery],
            problem_description: Some("won't start".to_string()),
            vehicle: VehicleInfo {
                vehicle_type: "Car".to_string(),
                brand: "Maruti".to_string(),
                model: "Swift".to_string(),
            },
            location: GeoPoint::new(77.59, 12.97),
            address: ServiceAddress {
                formatted_address: "1 MG Road".to_string(),
                landmark: None,
                city: "Bengaluru".to_string(),
                state: "Karnataka".to_string(),
                pincode: "560001".to_string(),
            },
            initial_radius_km: 5.0,
        }
    }

    #[test]
    fn test_create_starts_in_created_with_one_history_entry() {
        let booking = Booking::create(sample_new_booking());
        assert_eq!(booking.state, BookingState::Created);
        assert!(booking.vendor_id.is_none());
        assert_eq!(booking.dispatch_radius_km, 5.0);
        assert_eq!(booking.state_history.0.len(), 1);
        assert_eq!(booking.state_history.0[0].state, BookingState::Created);
        assert_eq!(booking.state_history.0[0].actor, Actor::Customer);
    }

    #[test]
    fn test_service_item_tagged_representation() {
        let custom = ServiceItem::Custom {
            name: "Fan belt replacement".to_string(),
        };
        let json = serde_json::to_value(&custom).unwrap();
        assert_eq!(json["kind"], "custom");
        assert_eq!(json["name"], "Fan belt replacement");

        let catalog = ServiceItem::Catalog {
            service_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&catalog).unwrap();
        assert_eq!(json["kind"], "catalog");
    }

    #[test]
    fn test_suggested_service_flattens_item() {
        let svc = SuggestedService {
            item: ServiceItem::Custom {
                name: "Jump start".to_string(),
            },
            quoted_price: 300.0,
        };
        let json = serde_json::to_value(&svc).unwrap();
        assert_eq!(json["kind"], "custom");
        assert_eq!(json["quoted_price"], 300.0);
    }
}
