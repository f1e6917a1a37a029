//! Eligibility filter: narrows the vendor directory to a bounded candidate
//! set for one booking.
//!
//! The predicate here is the in-process rendition of the SQL the Postgres
//! directory runs; the in-memory directory and the unit tests share it.
//! A pure read with no side effects: no candidates is a normal condition
//! handled by the dispatcher, not a failure.

use uuid::Uuid;

use crate::common::types::{GeoPoint, ServiceCategory};
use crate::domains::bookings::models::Booking;
use crate::domains::vendors::models::Vendor;

/// Upper bound on candidates returned for a single dispatch pass
pub const CANDIDATE_CAP: usize = 10;

/// What a booking asks of the directory
#[derive(Debug, Clone)]
pub struct EligibilityQuery {
    pub location: GeoPoint,
    pub categories: Vec<ServiceCategory>,
    pub radius_km: f64,
}

impl EligibilityQuery {
    pub fn for_booking(booking: &Booking) -> Self {
        Self {
            location: booking.location(),
            categories: booking.service_categories.0.clone(),
            radius_km: booking.dispatch_radius_km,
        }
    }
}

/// A vendor that passed the filter, with its distance from the service point
#[derive(Debug, Clone)]
pub struct VendorCandidate {
    pub vendor_id: Uuid,
    pub location: GeoPoint,
    pub distance_km: f64,
}

/// The eligibility predicate: verified, available, no active booking,
/// capable of at least one requested category, within radius.
pub fn is_eligible(vendor: &Vendor, query: &EligibilityQuery) -> bool {
    vendor.is_verified
        && vendor.is_available
        && vendor.active_booking_id.is_none()
        && vendor
            .service_categories
            .0
            .iter()
            .any(|c| query.categories.contains(c))
        && vendor.location().distance_km(&query.location) <= query.radius_km
}

/// Filter, order by ascending distance, cap at [`CANDIDATE_CAP`].
pub fn select_candidates<'a>(
    vendors: impl IntoIterator<Item = &'a Vendor>,
    query: &EligibilityQuery,
) -> Vec<VendorCandidate> {
    let mut candidates: Vec<VendorCandidate> = vendors
        .into_iter()
        .filter(|v| is_eligible(v, query))
        .map(|v| VendorCandidate {
            vendor_id: v.id,
            location: v.location(),
            distance_km: v.location().distance_km(&query.location),
        })
        .collect();

    candidates.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    candidates.truncate(CANDIDATE_CAP);
    candidates
}
