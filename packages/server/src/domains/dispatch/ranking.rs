//! Multi-factor vendor ranking.
//!
//! Pure functions over behavior counters and distance. Every factor is
//! smoothed so vendors with thin history land on a neutral prior instead
//! of an extreme, and the composite is a fixed weighted sum so two calls
//! over the same inputs always produce the same ordering.

use std::collections::HashMap;

use uuid::Uuid;

use crate::domains::dispatch::eligibility::VendorCandidate;
use crate::domains::vendors::models::VendorBehavior;

const WEIGHT_ACCEPTANCE: f64 = 0.30;
const WEIGHT_RATING: f64 = 0.25;
const WEIGHT_DISTANCE: f64 = 0.20;
const WEIGHT_EXPERIENCE: f64 = 0.15;
const WEIGHT_NO_SHOW: f64 = 0.40;

/// Minimum ratings before the real average replaces the neutral 4.0
const RATING_CONFIDENCE_THRESHOLD: i64 = 5;
/// Minimum accepted jobs before the no-show rate counts against a vendor
const NO_SHOW_CONFIDENCE_THRESHOLD: i64 = 3;

/// A candidate with its composite score, ready for batching
#[derive(Debug, Clone)]
pub struct RankedVendor {
    pub vendor_id: Uuid,
    pub distance_km: f64,
    pub score: f64,
}

/// Laplace-smoothed acceptance rate in (0, 1).
///
/// A vendor with no request history starts at exactly 0.5 and each
/// accepted or ignored request moves the estimate from there.
pub fn acceptance_rate(behavior: &VendorBehavior) -> f64 {
    if behavior.requests_received == 0 {
        return 0.5;
    }
    (behavior.requests_accepted + 1) as f64 / (behavior.requests_received + 2) as f64
}

/// Average rating on the 1..=5 scale, or the neutral 4.0 for vendors with
/// fewer than [`RATING_CONFIDENCE_THRESHOLD`] ratings.
pub fn rating_score(behavior: &VendorBehavior) -> f64 {
    if behavior.rating_count >= RATING_CONFIDENCE_THRESHOLD {
        behavior.rating_sum / behavior.rating_count as f64
    } else {
        4.0
    }
}

/// Log-scaled completed-job count. Unbounded but slow-growing, so raw
/// volume cannot drown out the behavioral factors.
pub fn experience_score(behavior: &VendorBehavior) -> f64 {
    ((behavior.services_completed + 1) as f64).log10()
}

/// Fraction of accepted jobs the vendor failed to show up for, or 0.0
/// until the vendor has enough accepted jobs to judge.
pub fn no_show_rate(behavior: &VendorBehavior) -> f64 {
    if behavior.requests_accepted >= NO_SHOW_CONFIDENCE_THRESHOLD {
        behavior.requests_no_show as f64 / behavior.requests_accepted as f64
    } else {
        0.0
    }
}

/// Inverse-distance proximity in (0, 1], 1.0 at zero distance
pub fn distance_score(distance_km: f64) -> f64 {
    1.0 / (distance_km + 1.0)
}

/// The composite: positive weights on acceptance, rating, proximity and
/// experience, a penalty on no-shows.
pub fn vendor_score(behavior: &VendorBehavior, distance_km: f64) -> f64 {
    WEIGHT_ACCEPTANCE * acceptance_rate(behavior)
        + WEIGHT_RATING * (rating_score(behavior) / 5.0)
        + WEIGHT_DISTANCE * distance_score(distance_km)
        + WEIGHT_EXPERIENCE * experience_score(behavior)
        - WEIGHT_NO_SHOW * no_show_rate(behavior)
}

/// Score each candidate and order by descending score.
///
/// Candidates with no behavior row score against the all-zero aggregate.
/// The sort is stable, so candidates with equal scores keep the incoming
/// nearest-first order.
pub fn rank_candidates(
    candidates: &[VendorCandidate],
    behaviors: &HashMap<Uuid, VendorBehavior>,
) -> Vec<RankedVendor> {
    let neutral = VendorBehavior::default();
    let mut ranked: Vec<RankedVendor> = candidates
        .iter()
        .map(|c| {
            let behavior = behaviors.get(&c.vendor_id).unwrap_or(&neutral);
            RankedVendor {
                vendor_id: c.vendor_id,
                distance_km: c.distance_km,
                score: vendor_score(behavior, c.distance_km),
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}
