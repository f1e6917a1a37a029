//! Per-vendor behavior aggregate: monotonic counters only.
//!
//! No derived scores are ever stored; the ranking engine computes them on
//! read. Writers use commutative in-SQL increments so concurrent booking
//! flows never race on a read-modify-write.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rolling counters capturing a vendor's historical reliability.
///
/// `Default` is the neutral aggregate used for vendors with no history yet
/// (all zeroes), which the scoring formulas map to their smoothed priors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct VendorBehavior {
    pub vendor_id: Uuid,

    // Request flow
    pub requests_received: i64,
    pub requests_accepted: i64,
    pub requests_rejected: i64,
    pub requests_no_show: i64,
    pub requests_cancelled_by_customer: i64,

    // Service history
    pub services_completed: i64,

    // Ratings (raw facts)
    pub rating_sum: f64,
    pub rating_count: i64,
}
