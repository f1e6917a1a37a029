pub mod actions;
pub mod models;
pub mod state;

pub use state::BookingState;
