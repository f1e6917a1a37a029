pub mod accept_booking;
pub mod approve_services;
pub mod cancel_booking;
pub mod create_booking;
pub mod progress;
pub mod queries;
pub mod submit_diagnosis;

pub use accept_booking::accept_booking;
pub use approve_services::{approve_services, ApprovalRequest};
pub use cancel_booking::{cancel_booking, CancelRequest};
pub use create_booking::{create_booking, CreateBookingRequest};
pub use progress::{
    complete_service, mark_en_route, rate_booking, reject_booking, start_inspection, RatingRequest,
};
pub use queries::get_booking;
pub use submit_diagnosis::{submit_diagnosis, DiagnosisRequest};
