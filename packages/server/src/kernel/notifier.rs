//! Offer delivery.
//!
//! Delivery transport (push, SMS, websocket) is outside this service; the
//! default notifier just records the offer in the structured log so the
//! dispatch timeline is observable end to end.

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::kernel::traits::BaseOfferNotifier;

pub struct LogNotifier;

#[async_trait]
impl BaseOfferNotifier for LogNotifier {
    async fn notify_offer(&self, booking_id: Uuid, vendor_ids: &[Uuid]) -> Result<(), AppError> {
        tracing::info!(
            booking_id = %booking_id,
            vendor_count = vendor_ids.len(),
            vendors = ?vendor_ids,
            "offering booking to vendor batch"
        );
        Ok(())
    }
}
