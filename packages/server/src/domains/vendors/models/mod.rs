pub mod behavior;
pub mod vendor;

pub use behavior::VendorBehavior;
pub use vendor::{PostgresVendorDirectory, Vendor};
