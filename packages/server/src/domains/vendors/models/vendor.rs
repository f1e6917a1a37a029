//! Vendor model and the PostgreSQL-backed vendor directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::common::types::{GeoPoint, ServiceCategory};
use crate::domains::dispatch::eligibility::{EligibilityQuery, VendorCandidate, CANDIDATE_CAP};
use crate::domains::vendors::models::behavior::VendorBehavior;
use crate::kernel::traits::BaseVendorDirectory;

/// A service-providing entity. Referenced, never owned, by bookings.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Vendor {
    pub id: Uuid,
    pub full_name: String,
    pub shop_name: String,

    /// Must be true before the vendor can receive offers
    pub is_verified: bool,
    pub is_available: bool,

    // Current location
    pub lng: f64,
    pub lat: f64,

    pub service_categories: Json<Vec<ServiceCategory>>,

    /// A vendor with an active booking is ineligible for new offers
    /// regardless of the availability flag
    pub active_booking_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vendor {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lng, self.lat)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    id: Uuid,
    lng: f64,
    lat: f64,
    distance_km: f64,
}

/// PostgreSQL-backed vendor directory.
///
/// Eligibility runs against the `haversine_distance` SQL function so the
/// database does candidate selection with the same distance model the
/// ranking engine uses in process.
pub struct PostgresVendorDirectory {
    pool: PgPool,
}

impl PostgresVendorDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseVendorDirectory for PostgresVendorDirectory {
    async fn find_vendor(&self, id: Uuid) -> Result<Option<Vendor>, AppError> {
        let vendor = sqlx::query_as::<_, Vendor>("SELECT * FROM vendors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(vendor)
    }

    async fn find_eligible(
        &self,
        query: &EligibilityQuery,
    ) -> Result<Vec<VendorCandidate>, AppError> {
        let categories: Vec<String> = query
            .categories
            .iter()
            .map(|c| c.as_str().to_string())
            .collect();

        let rows = sqlx::query_as::<_, CandidateRow>(
            "SELECT v.id, v.lng, v.lat,
                    haversine_distance($1, $2, v.lat, v.lng) AS distance_km
             FROM vendors v
             WHERE v.is_verified = true
               AND v.is_available = true
               AND v.active_booking_id IS NULL
               AND v.service_categories ?| $3
               AND haversine_distance($1, $2, v.lat, v.lng) <= $4
             ORDER BY distance_km ASC
             LIMIT $5",
        )
        .bind(query.location.lat)
        .bind(query.location.lng)
        .bind(&categories)
        .bind(query.radius_km)
        .bind(CANDIDATE_CAP as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| VendorCandidate {
                vendor_id: r.id,
                location: GeoPoint::new(r.lng, r.lat),
                distance_km: r.distance_km,
            })
            .collect())
    }

    async fn behaviors_for(
        &self,
        vendor_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, VendorBehavior>, AppError> {
        let rows = sqlx::query_as::<_, VendorBehavior>(
            "SELECT * FROM vendor_behaviors WHERE vendor_id = ANY($1)",
        )
        .bind(vendor_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|b| (b.vendor_id, b)).collect())
    }

    async fn set_active_booking(
        &self,
        vendor_id: Uuid,
        booking_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE vendors SET active_booking_id = $2, updated_at = now() WHERE id = $1")
            .bind(vendor_id)
            .bind(booking_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_requests_received(&self, vendor_ids: &[Uuid]) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO vendor_behaviors (vendor_id, requests_received)
             SELECT unnest($1::uuid[]), 1
             ON CONFLICT (vendor_id) DO UPDATE
                SET requests_received = vendor_behaviors.requests_received + 1,
                    updated_at = now()",
        )
        .bind(vendor_ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_request_accepted(&self, vendor_id: Uuid) -> Result<(), AppError> {
        self.increment(vendor_id, "requests_accepted").await
    }

    async fn record_request_rejected(&self, vendor_id: Uuid) -> Result<(), AppError> {
        self.increment(vendor_id, "requests_rejected").await
    }

    async fn record_no_show(&self, vendor_id: Uuid) -> Result<(), AppError> {
        self.increment(vendor_id, "requests_no_show").await
    }

    async fn record_cancelled_by_customer(&self, vendor_id: Uuid) -> Result<(), AppError> {
        self.increment(vendor_id, "requests_cancelled_by_customer")
            .await
    }

    async fn record_service_completed(&self, vendor_id: Uuid) -> Result<(), AppError> {
        self.increment(vendor_id, "services_completed").await
    }

    async fn record_rating(&self, vendor_id: Uuid, rating: u8) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO vendor_behaviors (vendor_id, rating_sum, rating_count)
             VALUES ($1, $2, 1)
             ON CONFLICT (vendor_id) DO UPDATE
                SET rating_sum = vendor_behaviors.rating_sum + $2,
                    rating_count = vendor_behaviors.rating_count + 1,
                    updated_at = now()",
        )
        .bind(vendor_id)
        .bind(f64::from(rating))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl PostgresVendorDirectory {
    /// Commutative `counter = counter + 1` upsert. Column names are fixed
    /// strings from this module, never caller input.
    async fn increment(&self, vendor_id: Uuid, column: &str) -> Result<(), AppError> {
        let sql = format!(
            "INSERT INTO vendor_behaviors (vendor_id, {column})
             VALUES ($1, 1)
             ON CONFLICT (vendor_id) DO UPDATE
                SET {column} = vendor_behaviors.{column} + 1,
                    updated_at = now()"
        );
        sqlx::query(&sql).bind(vendor_id).execute(&self.pool).await?;
        Ok(())
    }
}
