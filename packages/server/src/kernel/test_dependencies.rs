// In-memory implementations of the kernel traits for tests.
//
// These mirror the Postgres guards exactly: every conditional mutation
// checks its guard and writes under one lock, so concurrency tests see the
// same lose-the-race behavior as the real store. Locks may unwrap here;
// a poisoned lock in a test should abort the test.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::common::types::Actor;
use crate::domains::bookings::models::{
    Booking, Cancellation, Diagnosis, DispatchMeta, NewBooking, ServiceExecution,
    StateHistoryEntry, UserApproval,
};
use crate::domains::bookings::state::BookingState;
use crate::domains::dispatch::eligibility::{self, EligibilityQuery, VendorCandidate};
use crate::domains::vendors::models::{Vendor, VendorBehavior};
use crate::kernel::traits::{BaseBookingStore, BaseOfferNotifier, BaseVendorDirectory};

// =============================================================================
// Booking store
// =============================================================================

#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: Mutex<HashMap<Uuid, Booking>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `mutate` iff `guard` holds, under one lock acquisition.
    fn update(
        &self,
        id: Uuid,
        guard: impl Fn(&Booking) -> bool,
        mutate: impl FnOnce(&mut Booking),
    ) -> Option<Booking> {
        let mut bookings = self.bookings.lock().unwrap();
        let booking = bookings.get_mut(&id)?;
        if !guard(booking) {
            return None;
        }
        mutate(booking);
        booking.updated_at = Utc::now();
        Some(booking.clone())
    }
}

fn push_history(booking: &mut Booking, state: BookingState, actor: Actor, reason: &str) {
    booking.state = state;
    booking
        .state_history
        .0
        .push(StateHistoryEntry::new(state, actor, Some(reason.to_string())));
}

#[async_trait]
impl BaseBookingStore for InMemoryBookingStore {
    async fn insert_booking(&self, new: NewBooking) -> Result<Booking, AppError> {
        let mut bookings = self.bookings.lock().unwrap();
        let has_ongoing = bookings
            .values()
            .any(|b| b.customer_id == new.customer_id && b.state.is_ongoing());
        if has_ongoing {
            return Err(AppError::Validation(
                "an ongoing booking already exists for this customer".to_string(),
            ));
        }
        let booking = Booking::create(new);
        bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, AppError> {
        Ok(self.bookings.lock().unwrap().get(&id).cloned())
    }

    async fn mark_dispatching(&self, id: Uuid) -> Result<Option<Booking>, AppError> {
        Ok(self.update(
            id,
            |b| b.state == BookingState::Created,
            |b| push_history(b, BookingState::Dispatching, Actor::System, "Dispatch started"),
        ))
    }

    async fn store_dispatch_meta(
        &self,
        id: Uuid,
        meta: DispatchMeta,
    ) -> Result<Option<Booking>, AppError> {
        Ok(self.update(
            id,
            |b| b.state == BookingState::Dispatching && b.vendor_id.is_none(),
            |b| b.dispatch_meta = Some(Json(meta)),
        ))
    }

    async fn advance_batch_index(&self, id: Uuid) -> Result<Option<Booking>, AppError> {
        Ok(self.update(
            id,
            |b| {
                b.state == BookingState::Dispatching
                    && b.vendor_id.is_none()
                    && b.dispatch_meta.is_some()
            },
            |b| {
                if let Some(meta) = b.dispatch_meta.as_mut() {
                    meta.current_batch_index += 1;
                    meta.last_dispatch_at = Some(Utc::now());
                }
            },
        ))
    }

    async fn expand_search_radius(
        &self,
        id: Uuid,
        increment_km: f64,
    ) -> Result<Option<Booking>, AppError> {
        Ok(self.update(
            id,
            |b| b.state == BookingState::Dispatching && b.vendor_id.is_none(),
            |b| {
                b.dispatch_radius_km += increment_km;
                b.dispatch_meta = None;
            },
        ))
    }

    async fn bind_vendor(&self, id: Uuid, vendor_id: Uuid) -> Result<Option<Booking>, AppError> {
        Ok(self.update(
            id,
            |b| b.state == BookingState::Dispatching && b.vendor_id.is_none(),
            |b| {
                b.vendor_id = Some(vendor_id);
                push_history(
                    b,
                    BookingState::VendorAssigned,
                    Actor::Vendor,
                    "Vendor accepted the request",
                );
            },
        ))
    }

    async fn transition(
        &self,
        id: Uuid,
        from: BookingState,
        to: BookingState,
        actor: Actor,
        by_vendor: Option<Uuid>,
        reason: Option<String>,
    ) -> Result<Option<Booking>, AppError> {
        Ok(self.update(
            id,
            |b| b.state == from && by_vendor.map_or(true, |v| b.vendor_id == Some(v)),
            |b| push_history(b, to, actor, reason.as_deref().unwrap_or_default()),
        ))
    }

    async fn record_diagnosis(
        &self,
        id: Uuid,
        vendor_id: Uuid,
        diagnosis: Diagnosis,
    ) -> Result<Option<Booking>, AppError> {
        Ok(self.update(
            id,
            |b| b.state == BookingState::InspectionInProgress && b.vendor_id == Some(vendor_id),
            |b| {
                b.diagnosis = Some(Json(diagnosis));
                push_history(
                    b,
                    BookingState::WaitingForUserApproval,
                    Actor::Vendor,
                    "Diagnosis submitted",
                );
            },
        ))
    }

    async fn record_approval(
        &self,
        id: Uuid,
        customer_id: Uuid,
        approval: UserApproval,
        execution: ServiceExecution,
    ) -> Result<Option<Booking>, AppError> {
        Ok(self.update(
            id,
            |b| b.state == BookingState::WaitingForUserApproval && b.customer_id == customer_id,
            |b| {
                b.user_approval = Some(Json(approval));
                b.service_execution = Some(Json(execution));
                push_history(
                    b,
                    BookingState::ServiceInProgress,
                    Actor::Customer,
                    "Services approved",
                );
            },
        ))
    }

    async fn record_completion(
        &self,
        id: Uuid,
        vendor_id: Uuid,
    ) -> Result<Option<Booking>, AppError> {
        Ok(self.update(
            id,
            |b| b.state == BookingState::ServiceInProgress && b.vendor_id == Some(vendor_id),
            |b| {
                if let Some(execution) = b.service_execution.as_mut() {
                    execution.completed_at = Some(Utc::now());
                }
                push_history(b, BookingState::Completed, Actor::Vendor, "Service completed");
            },
        ))
    }

    async fn record_cancellation(
        &self,
        id: Uuid,
        cancellation: Cancellation,
    ) -> Result<Option<Booking>, AppError> {
        Ok(self.update(
            id,
            |b| !b.state.is_terminal(),
            |b| {
                let actor = cancellation.actor;
                let reason = cancellation.reason.clone();
                b.cancellation = Some(Json(cancellation));
                push_history(b, BookingState::Cancelled, actor, &reason);
            },
        ))
    }

    async fn find_stale_dispatches(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, AppError> {
        let bookings = self.bookings.lock().unwrap();
        let mut stale: Vec<Booking> = bookings
            .values()
            .filter(|b| match b.state {
                BookingState::Created => b.created_at < cutoff,
                BookingState::Dispatching => {
                    b.vendor_id.is_none()
                        && b.updated_at < cutoff
                        && b.dispatch_meta
                            .as_ref()
                            .and_then(|m| m.last_dispatch_at)
                            .map_or(true, |at| at < cutoff)
                }
                _ => false,
            })
            .cloned()
            .collect();
        stale.sort_by_key(|b| b.created_at);
        Ok(stale)
    }
}

// =============================================================================
// Vendor directory
// =============================================================================

#[derive(Default)]
pub struct InMemoryVendorDirectory {
    vendors: Mutex<HashMap<Uuid, Vendor>>,
    behaviors: Mutex<HashMap<Uuid, VendorBehavior>>,
}

impl InMemoryVendorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_vendor(&self, vendor: Vendor) {
        self.vendors.lock().unwrap().insert(vendor.id, vendor);
    }

    pub fn set_behavior(&self, behavior: VendorBehavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(behavior.vendor_id, behavior);
    }

    pub fn behavior(&self, vendor_id: Uuid) -> VendorBehavior {
        self.behaviors
            .lock()
            .unwrap()
            .get(&vendor_id)
            .cloned()
            .unwrap_or(VendorBehavior {
                vendor_id,
                ..Default::default()
            })
    }

    fn with_behavior(&self, vendor_id: Uuid, f: impl FnOnce(&mut VendorBehavior)) {
        let mut behaviors = self.behaviors.lock().unwrap();
        let behavior = behaviors.entry(vendor_id).or_insert_with(|| VendorBehavior {
            vendor_id,
            ..Default::default()
        });
        f(behavior);
    }
}

#[async_trait]
impl BaseVendorDirectory for InMemoryVendorDirectory {
    async fn find_vendor(&self, id: Uuid) -> Result<Option<Vendor>, AppError> {
        Ok(self.vendors.lock().unwrap().get(&id).cloned())
    }

    async fn find_eligible(
        &self,
        query: &EligibilityQuery,
    ) -> Result<Vec<VendorCandidate>, AppError> {
        let vendors = self.vendors.lock().unwrap();
        Ok(eligibility::select_candidates(vendors.values(), query))
    }

    async fn behaviors_for(
        &self,
        vendor_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, VendorBehavior>, AppError> {
        let behaviors = self.behaviors.lock().unwrap();
        Ok(vendor_ids
            .iter()
            .filter_map(|id| behaviors.get(id).map(|b| (*id, b.clone())))
            .collect())
    }

    async fn set_active_booking(
        &self,
        vendor_id: Uuid,
        booking_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        if let Some(vendor) = self.vendors.lock().unwrap().get_mut(&vendor_id) {
            vendor.active_booking_id = booking_id;
        }
        Ok(())
    }

    async fn record_requests_received(&self, vendor_ids: &[Uuid]) -> Result<(), AppError> {
        for &id in vendor_ids {
            self.with_behavior(id, |b| b.requests_received += 1);
        }
        Ok(())
    }

    async fn record_request_accepted(&self, vendor_id: Uuid) -> Result<(), AppError> {
        self.with_behavior(vendor_id, |b| b.requests_accepted += 1);
        Ok(())
    }

    async fn record_request_rejected(&self, vendor_id: Uuid) -> Result<(), AppError> {
        self.with_behavior(vendor_id, |b| b.requests_rejected += 1);
        Ok(())
    }

    async fn record_no_show(&self, vendor_id: Uuid) -> Result<(), AppError> {
        self.with_behavior(vendor_id, |b| b.requests_no_show += 1);
        Ok(())
    }

    async fn record_cancelled_by_customer(&self, vendor_id: Uuid) -> Result<(), AppError> {
        self.with_behavior(vendor_id, |b| b.requests_cancelled_by_customer += 1);
        Ok(())
    }

    async fn record_service_completed(&self, vendor_id: Uuid) -> Result<(), AppError> {
        self.with_behavior(vendor_id, |b| b.services_completed += 1);
        Ok(())
    }

    async fn record_rating(&self, vendor_id: Uuid, rating: u8) -> Result<(), AppError> {
        self.with_behavior(vendor_id, |b| {
            b.rating_sum += f64::from(rating);
            b.rating_count += 1;
        });
        Ok(())
    }
}

// =============================================================================
// Offer notifier
// =============================================================================

/// Records every offer so tests can assert on the dispatch timeline.
#[derive(Default)]
pub struct RecordingNotifier {
    offers: Mutex<Vec<(Uuid, Vec<Uuid>)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offers(&self) -> Vec<(Uuid, Vec<Uuid>)> {
        self.offers.lock().unwrap().clone()
    }

    /// All vendor ids offered to, in offer order, flattened across batches
    pub fn offered_vendors(&self) -> Vec<Uuid> {
        self.offers
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, vendors)| vendors.iter().copied())
            .collect()
    }
}

#[async_trait]
impl BaseOfferNotifier for RecordingNotifier {
    async fn notify_offer(&self, booking_id: Uuid, vendor_ids: &[Uuid]) -> Result<(), AppError> {
        self.offers
            .lock()
            .unwrap()
            .push((booking_id, vendor_ids.to_vec()));
        Ok(())
    }
}
