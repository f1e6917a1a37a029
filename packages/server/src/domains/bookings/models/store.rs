//! PostgreSQL-backed booking store.
//!
//! Every guarded mutation is a single conditional `UPDATE ... RETURNING *`:
//! the WHERE clause carries the state guard, so concurrency control is the
//! database's row lock and a zero-row update means the guard lost. History
//! appends ride along in the same statement; no mutation here is ever split
//! across two round trips.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::common::types::Actor;
use crate::domains::bookings::models::{
    Booking, Cancellation, Diagnosis, DispatchMeta, NewBooking, ServiceExecution,
    StateHistoryEntry, UserApproval,
};
use crate::domains::bookings::state::BookingState;
use crate::kernel::traits::BaseBookingStore;

pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn history_entry(
        state: BookingState,
        actor: Actor,
        reason: Option<&str>,
    ) -> Json<Vec<StateHistoryEntry>> {
        Json(vec![StateHistoryEntry::new(
            state,
            actor,
            reason.map(str::to_string),
        )])
    }
}

#[async_trait]
impl BaseBookingStore for PostgresBookingStore {
    async fn insert_booking(&self, new: NewBooking) -> Result<Booking, AppError> {
        let booking = Booking::create(new);
        // The partial unique index on customer_id over non-terminal states
        // turns a second ongoing booking into a unique violation, which the
        // sqlx error conversion surfaces as Conflict
        let inserted = sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings
                (id, customer_id, service_categories, problem_description, vehicle,
                 lng, lat, address, dispatch_radius_km, state, state_history,
                 created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
             RETURNING *",
        )
        .bind(booking.id)
        .bind(booking.customer_id)
        .bind(&booking.service_categories)
        .bind(&booking.problem_description)
        .bind(&booking.vehicle)
        .bind(booking.lng)
        .bind(booking.lat)
        .bind(&booking.address)
        .bind(booking.dispatch_radius_km)
        .bind(booking.state)
        .bind(&booking.state_history)
        .bind(booking.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(booking)
    }

    async fn mark_dispatching(&self, id: Uuid) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings
             SET state = 'DISPATCHING',
                 state_history = state_history || $2,
                 updated_at = now()
             WHERE id = $1 AND state = 'CREATED'
             RETURNING *",
        )
        .bind(id)
        .bind(Self::history_entry(
            BookingState::Dispatching,
            Actor::System,
            Some("Dispatch started"),
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn store_dispatch_meta(
        &self,
        id: Uuid,
        meta: DispatchMeta,
    ) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings
             SET dispatch_meta = $2, updated_at = now()
             WHERE id = $1 AND state = 'DISPATCHING' AND vendor_id IS NULL
             RETURNING *",
        )
        .bind(id)
        .bind(Json(meta))
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn advance_batch_index(&self, id: Uuid) -> Result<Option<Booking>, AppError> {
        // Both fields move in one jsonb_set chain so a crash between batches
        // can never leave the index and the timestamp disagreeing
        let stamped = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings
             SET dispatch_meta = jsonb_set(
                     jsonb_set(
                         dispatch_meta,
                         '{current_batch_index}',
                         to_jsonb((dispatch_meta->>'current_batch_index')::int + 1)
                     ),
                     '{last_dispatch_at}',
                     to_jsonb($2::text)
                 ),
                 updated_at = now()
             WHERE id = $1
               AND state = 'DISPATCHING'
               AND vendor_id IS NULL
               AND dispatch_meta IS NOT NULL
             RETURNING *",
        )
        .bind(id)
        .bind(stamped)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn expand_search_radius(
        &self,
        id: Uuid,
        increment_km: f64,
    ) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings
             SET dispatch_radius_km = dispatch_radius_km + $2,
                 dispatch_meta = NULL,
                 updated_at = now()
             WHERE id = $1 AND state = 'DISPATCHING' AND vendor_id IS NULL
             RETURNING *",
        )
        .bind(id)
        .bind(increment_km)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn bind_vendor(&self, id: Uuid, vendor_id: Uuid) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings
             SET vendor_id = $2,
                 state = 'VENDOR_ASSIGNED',
                 state_history = state_history || $3,
                 updated_at = now()
             WHERE id = $1 AND state = 'DISPATCHING' AND vendor_id IS NULL
             RETURNING *",
        )
        .bind(id)
        .bind(vendor_id)
        .bind(Self::history_entry(
            BookingState::VendorAssigned,
            Actor::Vendor,
            Some("Vendor accepted the request"),
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
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
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings
             SET state = $3,
                 state_history = state_history || $5,
                 updated_at = now()
             WHERE id = $1
               AND state = $2
               AND ($4::uuid IS NULL OR vendor_id = $4)
             RETURNING *",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(by_vendor)
        .bind(Self::history_entry(to, actor, reason.as_deref()))
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn record_diagnosis(
        &self,
        id: Uuid,
        vendor_id: Uuid,
        diagnosis: Diagnosis,
    ) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings
             SET diagnosis = $3,
                 state = 'WAITING_FOR_USER_APPROVAL',
                 state_history = state_history || $4,
                 updated_at = now()
             WHERE id = $1 AND vendor_id = $2 AND state = 'INSPECTION_IN_PROGRESS'
             RETURNING *",
        )
        .bind(id)
        .bind(vendor_id)
        .bind(Json(diagnosis))
        .bind(Self::history_entry(
            BookingState::WaitingForUserApproval,
            Actor::Vendor,
            Some("Diagnosis submitted"),
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn record_approval(
        &self,
        id: Uuid,
        customer_id: Uuid,
        approval: UserApproval,
        execution: ServiceExecution,
    ) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings
             SET user_approval = $3,
                 service_execution = $4,
                 state = 'SERVICE_IN_PROGRESS',
                 state_history = state_history || $5,
                 updated_at = now()
             WHERE id = $1 AND customer_id = $2 AND state = 'WAITING_FOR_USER_APPROVAL'
             RETURNING *",
        )
        .bind(id)
        .bind(customer_id)
        .bind(Json(approval))
        .bind(Json(execution))
        .bind(Self::history_entry(
            BookingState::ServiceInProgress,
            Actor::Customer,
            Some("Services approved"),
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn record_completion(
        &self,
        id: Uuid,
        vendor_id: Uuid,
    ) -> Result<Option<Booking>, AppError> {
        // service_execution is guaranteed present: approval wrote it and the
        // state guard proves approval happened
        let stamped = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings
             SET state = 'COMPLETED',
                 service_execution =
                     jsonb_set(service_execution, '{completed_at}', to_jsonb($3::text)),
                 state_history = state_history || $4,
                 updated_at = now()
             WHERE id = $1 AND vendor_id = $2 AND state = 'SERVICE_IN_PROGRESS'
             RETURNING *",
        )
        .bind(id)
        .bind(vendor_id)
        .bind(stamped)
        .bind(Self::history_entry(
            BookingState::Completed,
            Actor::Vendor,
            Some("Service completed"),
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn record_cancellation(
        &self,
        id: Uuid,
        cancellation: Cancellation,
    ) -> Result<Option<Booking>, AppError> {
        let entry = Self::history_entry(
            BookingState::Cancelled,
            cancellation.actor,
            Some(&cancellation.reason),
        );
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings
             SET state = 'CANCELLED',
                 cancellation = $2,
                 state_history = state_history || $3,
                 updated_at = now()
             WHERE id = $1 AND state NOT IN ('COMPLETED', 'CANCELLED')
             RETURNING *",
        )
        .bind(id)
        .bind(Json(cancellation))
        .bind(entry)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn find_stale_dispatches(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, AppError> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings
             WHERE (state = 'CREATED' AND created_at < $1)
                OR (state = 'DISPATCHING'
                    AND vendor_id IS NULL
                    AND updated_at < $1
                    AND (dispatch_meta IS NULL
                         OR dispatch_meta->>'last_dispatch_at' IS NULL
                         OR (dispatch_meta->>'last_dispatch_at')::timestamptz < $1))
             ORDER BY created_at ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }
}
