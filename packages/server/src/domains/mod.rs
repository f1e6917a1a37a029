pub mod bookings;
pub mod dispatch;
pub mod vendors;
