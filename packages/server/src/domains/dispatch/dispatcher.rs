//! The wave dispatcher: the escalation loop that turns a `CREATED` booking
//! into a `VENDOR_ASSIGNED` one.
//!
//! Each cycle plans a wave (eligibility -> ranking -> batches of
//! `batch_size`), offers one batch at a time with a response window between
//! batches, and widens the radius when a wave runs dry. All progress is
//! persisted in `dispatch_meta` before every wait, so a crashed or restarted
//! process resumes exactly where the last one stopped. The dispatcher never
//! assigns a vendor itself; assignment happens through the store's
//! compare-and-set when a vendor accepts.

use std::sync::Arc;

use tokio::time::sleep;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::config::DispatchConfig;
use crate::domains::bookings::models::{Booking, DispatchMeta};
use crate::domains::bookings::state::BookingState;
use crate::domains::dispatch::eligibility::EligibilityQuery;
use crate::domains::dispatch::ranking::rank_candidates;
use crate::kernel::deps::ServerDeps;

/// How a dispatch cycle ended (exhaustion is the error path)
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A vendor accepted and is now bound
    Assigned(Uuid),
    /// The booking was cancelled mid-dispatch
    Cancelled,
    /// The booking left `DISPATCHING` through some other path; this
    /// dispatcher instance lost the race and stands down
    Superseded,
}

enum WaveResult {
    Outcome(DispatchOutcome),
    /// Every batch of the current wave was offered without an acceptance
    BatchesExhausted,
    /// Persisted wave plan vanished underneath us; plan again
    Replan,
}

pub struct WaveDispatcher {
    deps: Arc<ServerDeps>,
}

impl WaveDispatcher {
    pub fn new(deps: Arc<ServerDeps>) -> Self {
        Self { deps }
    }

    fn config(&self) -> &DispatchConfig {
        &self.deps.dispatch_config
    }

    /// Run the dispatch cycle for one booking until it is assigned,
    /// cancelled, superseded, or exhausted.
    ///
    /// Safe to call on a booking in any state: anything outside
    /// `CREATED`/`DISPATCHING` resolves immediately. Exhaustion leaves the
    /// booking in `DISPATCHING` at the capped radius and surfaces as
    /// [`AppError::Exhausted`].
    pub async fn run(&self, booking_id: Uuid) -> Result<DispatchOutcome, AppError> {
        loop {
            let Some(booking) = self.deps.booking_store.find_booking(booking_id).await? else {
                return Err(AppError::NotFound("booking not found".to_string()));
            };

            match booking.state {
                BookingState::Created => {
                    // Lost guards mean another dispatcher got here first
                    self.deps.booking_store.mark_dispatching(booking_id).await?;
                    continue;
                }
                BookingState::Dispatching => {
                    if let Some(vendor_id) = booking.vendor_id {
                        return Ok(DispatchOutcome::Assigned(vendor_id));
                    }
                }
                BookingState::Cancelled => return Ok(DispatchOutcome::Cancelled),
                BookingState::VendorAssigned => {
                    // vendor_id is always present past assignment
                    if let Some(vendor_id) = booking.vendor_id {
                        return Ok(DispatchOutcome::Assigned(vendor_id));
                    }
                    return Ok(DispatchOutcome::Superseded);
                }
                _ => return Ok(DispatchOutcome::Superseded),
            }

            let booking = match booking.dispatch_meta {
                Some(_) => booking,
                None => match self.plan_wave(&booking).await? {
                    Some(planned) => planned,
                    // Guard failed: state moved while planning
                    None => continue,
                },
            };

            match self.offer_batches(&booking).await? {
                WaveResult::Outcome(outcome) => return Ok(outcome),
                WaveResult::Replan => continue,
                WaveResult::BatchesExhausted => {
                    let config = self.config();
                    let next_radius = booking.dispatch_radius_km + config.radius_increment_km;
                    if next_radius > config.max_radius_km {
                        tracing::warn!(
                            booking_id = %booking_id,
                            radius_km = booking.dispatch_radius_km,
                            "dispatch exhausted at maximum search radius"
                        );
                        return Err(AppError::Exhausted(
                            "no vendor accepted within the maximum search radius".to_string(),
                        ));
                    }
                    tracing::info!(
                        booking_id = %booking_id,
                        next_radius_km = next_radius,
                        "expanding dispatch search radius"
                    );
                    self.deps
                        .booking_store
                        .expand_search_radius(booking_id, config.radius_increment_km)
                        .await?;
                }
            }
        }
    }

    /// Plan a fresh wave at the booking's current radius and persist it.
    async fn plan_wave(&self, booking: &Booking) -> Result<Option<Booking>, AppError> {
        let query = EligibilityQuery::for_booking(booking);
        let candidates = self.deps.vendor_directory.find_eligible(&query).await?;
        let vendor_ids: Vec<Uuid> = candidates.iter().map(|c| c.vendor_id).collect();
        let behaviors = self.deps.vendor_directory.behaviors_for(&vendor_ids).await?;
        let ranked = rank_candidates(&candidates, &behaviors);

        let batches = make_batches(
            ranked.iter().map(|r| r.vendor_id).collect(),
            self.config().batch_size,
        );
        tracing::info!(
            booking_id = %booking.id,
            radius_km = booking.dispatch_radius_km,
            candidates = candidates.len(),
            batches = batches.len(),
            "planned dispatch wave"
        );

        let meta = DispatchMeta {
            vendor_batches: batches,
            current_batch_index: 0,
            last_dispatch_at: None,
        };
        self.deps
            .booking_store
            .store_dispatch_meta(booking.id, meta)
            .await
    }

    /// Offer the wave's remaining batches in order, waiting out the response
    /// window after each, until someone accepts or the wave runs out.
    async fn offer_batches(&self, booking: &Booking) -> Result<WaveResult, AppError> {
        let booking_id = booking.id;
        loop {
            let Some(current) = self.deps.booking_store.find_booking(booking_id).await? else {
                return Err(AppError::NotFound("booking not found".to_string()));
            };
            match current.state {
                BookingState::Dispatching => {
                    if let Some(vendor_id) = current.vendor_id {
                        return Ok(WaveResult::Outcome(DispatchOutcome::Assigned(vendor_id)));
                    }
                }
                BookingState::VendorAssigned => {
                    return Ok(match current.vendor_id {
                        Some(vendor_id) => WaveResult::Outcome(DispatchOutcome::Assigned(vendor_id)),
                        None => WaveResult::Outcome(DispatchOutcome::Superseded),
                    });
                }
                BookingState::Cancelled => {
                    return Ok(WaveResult::Outcome(DispatchOutcome::Cancelled));
                }
                _ => return Ok(WaveResult::Outcome(DispatchOutcome::Superseded)),
            }

            let Some(meta) = current.dispatch_meta.as_ref() else {
                return Ok(WaveResult::Replan);
            };
            let Some(batch) = meta.vendor_batches.get(meta.current_batch_index) else {
                return Ok(WaveResult::BatchesExhausted);
            };

            if !batch.is_empty() {
                self.deps
                    .offer_notifier
                    .notify_offer(booking_id, batch)
                    .await?;
                self.deps
                    .vendor_directory
                    .record_requests_received(batch)
                    .await?;
            }

            // Stamp progress before the wait so a recovery sweep can tell an
            // in-flight window from an abandoned one
            if self
                .deps
                .booking_store
                .advance_batch_index(booking_id)
                .await?
                .is_none()
            {
                continue;
            }

            sleep(self.config().response_window).await;
        }
    }
}

/// Partition ranked vendor ids into offer batches, best-ranked first
pub fn make_batches(vendor_ids: Vec<Uuid>, batch_size: usize) -> Vec<Vec<Uuid>> {
    vendor_ids
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Whether a stale booking is worth handing back to a dispatcher: still
/// unassigned and not already stuck at the radius ceiling.
pub fn is_resumable(booking: &Booking, config: &DispatchConfig) -> bool {
    match booking.state {
        BookingState::Created => true,
        BookingState::Dispatching => {
            booking.vendor_id.is_none()
                && (booking.dispatch_radius_km + config.radius_increment_km
                    <= config.max_radius_km
                    || has_unoffered_batches(booking))
        }
        _ => false,
    }
}

fn has_unoffered_batches(booking: &Booking) -> bool {
    booking
        .dispatch_meta
        .as_ref()
        .map(|m| m.current_batch_index < m.vendor_batches.len())
        .unwrap_or(false)
}

/// Fire-and-forget dispatch for one booking. The HTTP handler returns as
/// soon as the booking exists; the cycle runs on its own task.
pub fn spawn_dispatch(deps: Arc<ServerDeps>, booking_id: Uuid) {
    tokio::spawn(async move {
        let dispatcher = WaveDispatcher::new(deps);
        match dispatcher.run(booking_id).await {
            Ok(outcome) => {
                tracing::info!(booking_id = %booking_id, ?outcome, "dispatch cycle finished")
            }
            Err(AppError::Exhausted(_)) => {
                tracing::warn!(booking_id = %booking_id, "dispatch cycle exhausted")
            }
            Err(error) => {
                tracing::error!(booking_id = %booking_id, %error, "dispatch cycle failed")
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_make_batches_partitions_in_order() {
        let vendors = ids(7);
        let batches = make_batches(vendors.clone(), 3);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0], vendors[0..3]);
        assert_eq!(batches[1], vendors[3..6]);
        assert_eq!(batches[2], vendors[6..7]);
    }

    #[test]
    fn test_make_batches_of_empty_input() {
        assert!(make_batches(vec![], 3).is_empty());
    }

    #[test]
    fn test_make_batches_tolerates_zero_batch_size() {
        let batches = make_batches(ids(2), 0);
        assert_eq!(batches.len(), 2);
    }
}
