//! Autoserve dispatch core.
//!
//! Matches incoming service bookings to field-service vendors and drives each
//! booking through its lifecycle: dispatch, assignment, inspection, diagnosis,
//! customer approval, execution, completion or cancellation.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;
