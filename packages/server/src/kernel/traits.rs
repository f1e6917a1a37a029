// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (eligibility, ranking, wave policy, transition legality)
// lives in domain functions that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseBookingStore)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::common::types::Actor;
use crate::domains::bookings::models::{
    Booking, Cancellation, Diagnosis, DispatchMeta, NewBooking, ServiceExecution, UserApproval,
};
use crate::domains::bookings::state::BookingState;
use crate::domains::dispatch::eligibility::{EligibilityQuery, VendorCandidate};
use crate::domains::vendors::models::{Vendor, VendorBehavior};

// =============================================================================
// Booking Store (atomic conditional updates over booking documents)
// =============================================================================

/// Persistent, indexed collection of booking documents.
///
/// Every mutation is an atomic conditional update guarded by the current
/// state; a `None` return means the guard failed (the document was missing
/// or no longer in the expected state) and nothing was written. Guards fail
/// closed: there are no partial writes.
#[async_trait]
pub trait BaseBookingStore: Send + Sync {
    /// Insert a new booking, enforcing the one-ongoing-booking-per-customer
    /// constraint atomically. Fails with `Conflict` when violated.
    async fn insert_booking(&self, new: NewBooking) -> Result<Booking, AppError>;

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, AppError>;

    /// `CREATED -> DISPATCHING` (actor SYSTEM)
    async fn mark_dispatching(&self, id: Uuid) -> Result<Option<Booking>, AppError>;

    /// Persist a freshly planned wave. Guard: still dispatching, unassigned.
    async fn store_dispatch_meta(
        &self,
        id: Uuid,
        meta: DispatchMeta,
    ) -> Result<Option<Booking>, AppError>;

    /// Move to the next batch and stamp `last_dispatch_at`.
    /// Guard: still dispatching, unassigned, meta present.
    async fn advance_batch_index(&self, id: Uuid) -> Result<Option<Booking>, AppError>;

    /// Widen the search radius and discard the exhausted wave plan.
    /// Guard: still dispatching, unassigned.
    async fn expand_search_radius(
        &self,
        id: Uuid,
        increment_km: f64,
    ) -> Result<Option<Booking>, AppError>;

    /// The vendor-binding compare-and-set: succeeds iff the booking is still
    /// `DISPATCHING` with no vendor bound. This is the sole synchronization
    /// point preventing double assignment; exactly one concurrent caller wins.
    async fn bind_vendor(&self, id: Uuid, vendor_id: Uuid) -> Result<Option<Booking>, AppError>;

    /// Generic guarded hop for transitions that carry no payload
    /// (en-route, inspection start). `by_vendor` additionally requires the
    /// booking to be bound to that vendor.
    async fn transition(
        &self,
        id: Uuid,
        from: BookingState,
        to: BookingState,
        actor: Actor,
        by_vendor: Option<Uuid>,
        reason: Option<String>,
    ) -> Result<Option<Booking>, AppError>;

    /// Record the vendor's findings and move to `WAITING_FOR_USER_APPROVAL`.
    /// Guard: `INSPECTION_IN_PROGRESS` under this vendor.
    async fn record_diagnosis(
        &self,
        id: Uuid,
        vendor_id: Uuid,
        diagnosis: Diagnosis,
    ) -> Result<Option<Booking>, AppError>;

    /// Record the customer's decision and the finalized line items, moving to
    /// `SERVICE_IN_PROGRESS`. Guard: `WAITING_FOR_USER_APPROVAL` owned by
    /// this customer.
    async fn record_approval(
        &self,
        id: Uuid,
        customer_id: Uuid,
        approval: UserApproval,
        execution: ServiceExecution,
    ) -> Result<Option<Booking>, AppError>;

    /// `SERVICE_IN_PROGRESS -> COMPLETED` under this vendor, stamping the
    /// execution's completion time.
    async fn record_completion(
        &self,
        id: Uuid,
        vendor_id: Uuid,
    ) -> Result<Option<Booking>, AppError>;

    /// Cancel from any non-terminal state. The booking keeps whatever
    /// `vendor_id` it had; cancellation is a state, not a deletion.
    async fn record_cancellation(
        &self,
        id: Uuid,
        cancellation: Cancellation,
    ) -> Result<Option<Booking>, AppError>;

    /// Bookings whose dispatch looks abandoned: stuck in `CREATED`, or
    /// `DISPATCHING` with no wave activity since `cutoff`. Used by the
    /// recovery sweep to resume waves after a process restart.
    async fn find_stale_dispatches(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, AppError>;
}

// =============================================================================
// Vendor Directory (vendors + behavior aggregates)
// =============================================================================

/// Persistent collection of vendors and their behavior aggregates.
///
/// Counter updates MUST be commutative increments (no read-modify-write),
/// since many booking flows mutate the same aggregate concurrently.
#[async_trait]
pub trait BaseVendorDirectory: Send + Sync {
    async fn find_vendor(&self, id: Uuid) -> Result<Option<Vendor>, AppError>;

    /// Eligible candidates for a booking: verified, available, capable of at
    /// least one requested category, no active booking, within radius.
    /// Ordered by ascending distance, capped at 10. An empty list is a
    /// normal outcome, never an error.
    async fn find_eligible(
        &self,
        query: &EligibilityQuery,
    ) -> Result<Vec<VendorCandidate>, AppError>;

    /// Behavior aggregates for the given vendors; vendors without a record
    /// are simply absent from the map (callers use neutral defaults).
    async fn behaviors_for(
        &self,
        vendor_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, VendorBehavior>, AppError>;

    /// Bind or clear the vendor's active booking.
    async fn set_active_booking(
        &self,
        vendor_id: Uuid,
        booking_id: Option<Uuid>,
    ) -> Result<(), AppError>;

    async fn record_requests_received(&self, vendor_ids: &[Uuid]) -> Result<(), AppError>;
    async fn record_request_accepted(&self, vendor_id: Uuid) -> Result<(), AppError>;
    async fn record_request_rejected(&self, vendor_id: Uuid) -> Result<(), AppError>;
    async fn record_no_show(&self, vendor_id: Uuid) -> Result<(), AppError>;
    async fn record_cancelled_by_customer(&self, vendor_id: Uuid) -> Result<(), AppError>;
    async fn record_service_completed(&self, vendor_id: Uuid) -> Result<(), AppError>;
    async fn record_rating(&self, vendor_id: Uuid, rating: u8) -> Result<(), AppError>;
}

// =============================================================================
// Offer Notifier (delivery is an external collaborator)
// =============================================================================

/// Delivers offers to a batch of vendors. This core only defines the point
/// at which an offer logically exists; delivery mechanics live outside.
#[async_trait]
pub trait BaseOfferNotifier: Send + Sync {
    async fn notify_offer(&self, booking_id: Uuid, vendor_ids: &[Uuid]) -> Result<(), AppError>;
}
