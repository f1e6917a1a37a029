// Dependency container for the server
//
// Bundles every injected collaborator behind the Base* traits so domain
// code and tests construct the same flows from different implementations.

use std::sync::Arc;

use crate::config::DispatchConfig;
use crate::kernel::traits::{BaseBookingStore, BaseOfferNotifier, BaseVendorDirectory};

#[derive(Clone)]
pub struct ServerDeps {
    pub dispatch_config: DispatchConfig,
    pub booking_store: Arc<dyn BaseBookingStore>,
    pub vendor_directory: Arc<dyn BaseVendorDirectory>,
    pub offer_notifier: Arc<dyn BaseOfferNotifier>,
}

impl ServerDeps {
    pub fn new(
        dispatch_config: DispatchConfig,
        booking_store: Arc<dyn BaseBookingStore>,
        vendor_directory: Arc<dyn BaseVendorDirectory>,
        offer_notifier: Arc<dyn BaseOfferNotifier>,
    ) -> Self {
        Self {
            dispatch_config,
            booking_store,
            vendor_directory,
            offer_notifier,
        }
    }
}
