pub mod bookings;
pub mod health;

pub use health::health_handler;
