//! Diagnosis submission by the assigned vendor.
//!
//! Each suggested line item is either a catalog reference or a custom name,
//! never both, and always carries a positive quoted price. Recording the
//! diagnosis moves the booking straight to `WAITING_FOR_USER_APPROVAL`.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::domains::bookings::models::{Booking, Diagnosis, ServiceItem, SuggestedService};
use crate::kernel::deps::ServerDeps;

const MIN_ISSUE_LEN: usize = 3;
const MIN_CUSTOM_NAME_LEN: usize = 3;

#[derive(Debug, Deserialize)]
pub struct DiagnosisRequest {
    pub issues: Vec<String>,
    pub services: Vec<ServiceItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceItemRequest {
    pub service_id: Option<Uuid>,
    pub custom_name: Option<String>,
    pub quoted_price: f64,
}

pub async fn submit_diagnosis(
    deps: Arc<ServerDeps>,
    booking_id: Uuid,
    vendor_id: Uuid,
    request: DiagnosisRequest,
) -> Result<Booking, AppError> {
    let diagnosis = build_diagnosis(request)?;

    let Some(booking) = deps
        .booking_store
        .record_diagnosis(booking_id, vendor_id, diagnosis)
        .await?
    else {
        // Wrong state or wrong vendor reads the same as a missing booking:
        // there is no inspection to report findings against
        return Err(AppError::NotFound(
            "booking is not under inspection by this vendor".to_string(),
        ));
    };

    tracing::info!(booking_id = %booking_id, vendor_id = %vendor_id, "diagnosis recorded");
    Ok(booking)
}

fn build_diagnosis(request: DiagnosisRequest) -> Result<Diagnosis, AppError> {
    if request.issues.is_empty() {
        return Err(AppError::Validation(
            "at least one issue is required".to_string(),
        ));
    }
    if request.issues.iter().any(|i| i.trim().len() < MIN_ISSUE_LEN) {
        return Err(AppError::Validation(format!(
            "each issue must be at least {MIN_ISSUE_LEN} characters"
        )));
    }
    if request.services.is_empty() {
        return Err(AppError::Validation(
            "at least one suggested service is required".to_string(),
        ));
    }

    let mut suggested = Vec::with_capacity(request.services.len());
    for service in request.services {
        if service.quoted_price <= 0.0 || !service.quoted_price.is_finite() {
            return Err(AppError::Validation(
                "quoted price must be a positive number".to_string(),
            ));
        }
        let item = match (service.service_id, service.custom_name) {
            (Some(service_id), None) => ServiceItem::Catalog { service_id },
            (None, Some(name)) if name.trim().len() >= MIN_CUSTOM_NAME_LEN => {
                ServiceItem::Custom { name }
            }
            (None, Some(_)) => {
                return Err(AppError::Validation(format!(
                    "custom service names must be at least {MIN_CUSTOM_NAME_LEN} characters"
                )))
            }
            _ => {
                return Err(AppError::Validation(
                    "each service needs exactly one of service_id or custom_name".to_string(),
                ))
            }
        };
        suggested.push(SuggestedService {
            item,
            quoted_price: service.quoted_price,
        });
    }

    Ok(Diagnosis {
        issues: request.issues,
        suggested_services: suggested,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(services: Vec<ServiceItemRequest>) -> DiagnosisRequest {
        DiagnosisRequest {
            issues: vec!["Dead battery cell".to_string()],
            services,
        }
    }

    fn catalog_item(price: f64) -> ServiceItemRequest {
        ServiceItemRequest {
            service_id: Some(Uuid::new_v4()),
            custom_name: None,
            quoted_price: price,
        }
    }

    #[test]
    fn test_catalog_and_custom_items_accepted() {
        let diagnosis = build_diagnosis(request_with(vec![
            catalog_item(1200.0),
            ServiceItemRequest {
                service_id: None,
                custom_name: Some("Terminal cleaning".to_string()),
                quoted_price: 150.0,
            },
        ]))
        .unwrap();
        assert_eq!(diagnosis.suggested_services.len(), 2);
        assert!(matches!(
            diagnosis.suggested_services[0].item,
            ServiceItem::Catalog { .. }
        ));
        assert!(matches!(
            diagnosis.suggested_services[1].item,
            ServiceItem::Custom { .. }
        ));
    }

    #[test]
    fn test_no_issues_rejected() {
        let mut request = request_with(vec![catalog_item(100.0)]);
        request.issues.clear();
        assert!(matches!(
            build_diagnosis(request),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_short_issue_rejected() {
        let mut request = request_with(vec![catalog_item(100.0)]);
        request.issues = vec!["ok".to_string()];
        assert!(matches!(
            build_diagnosis(request),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_no_services_rejected() {
        assert!(matches!(
            build_diagnosis(request_with(vec![])),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_non_positive_price_rejected() {
        assert!(matches!(
            build_diagnosis(request_with(vec![catalog_item(0.0)])),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            build_diagnosis(request_with(vec![catalog_item(-50.0)])),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_short_custom_name_rejected() {
        let request = request_with(vec![ServiceItemRequest {
            service_id: None,
            custom_name: Some("ab".to_string()),
            quoted_price: 200.0,
        }]);
        assert!(matches!(
            build_diagnosis(request),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_both_id_and_name_rejected() {
        let request = request_with(vec![ServiceItemRequest {
            service_id: Some(Uuid::new_v4()),
            custom_name: Some("Oil change".to_string()),
            quoted_price: 500.0,
        }]);
        assert!(matches!(
            build_diagnosis(request),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_neither_id_nor_name_rejected() {
        let request = request_with(vec![ServiceItemRequest {
            service_id: None,
            custom_name: None,
            quoted_price: 500.0,
        }]);
        assert!(matches!(
            build_diagnosis(request),
            Err(AppError::Validation(_))
        ));
    }
}
