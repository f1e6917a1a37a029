pub mod booking;
pub mod store;

pub use booking::{
    Booking, Cancellation, Diagnosis, DispatchMeta, FinalService, NewBooking, ServiceAddress,
    ServiceExecution, ServiceItem, StateHistoryEntry, SuggestedService, UserApproval, VehicleInfo,
};
pub use store::PostgresBookingStore;
