//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::routes::{bookings, health_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub deps: Arc<ServerDeps>,
}

/// Build the Axum application router
pub fn build_app(pool: PgPool, deps: Arc<ServerDeps>) -> Router {
    let state = AppState {
        db_pool: pool,
        deps,
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/bookings", post(bookings::create_booking_handler))
        .route("/bookings/:id", get(bookings::get_booking_handler))
        .route("/bookings/:id/accept", patch(bookings::accept_handler))
        .route("/bookings/:id/reject", post(bookings::reject_handler))
        .route("/bookings/:id/en-route", post(bookings::en_route_handler))
        .route(
            "/bookings/:id/start-inspection",
            post(bookings::start_inspection_handler),
        )
        .route("/bookings/:id/diagnosis", post(bookings::diagnosis_handler))
        .route(
            "/bookings/:id/approve-services",
            post(bookings::approve_services_handler),
        )
        .route("/bookings/:id/complete", post(bookings::complete_handler))
        .route("/bookings/:id/rate", post(bookings::rate_handler))
        .route("/bookings/:id/cancel", post(bookings::cancel_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}
