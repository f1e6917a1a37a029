pub mod deps;
pub mod notifier;
pub mod scheduled_tasks;
pub mod test_dependencies;
pub mod traits;

pub use deps::ServerDeps;
pub use notifier::LogNotifier;
pub use traits::{BaseBookingStore, BaseOfferNotifier, BaseVendorDirectory};
