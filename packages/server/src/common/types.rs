//! Shared value types: service categories, acting principals, coordinates.

use serde::{Deserialize, Serialize};

use crate::common::error::AppError;

/// Fixed catalog of service categories a booking may request and a vendor
/// may advertise. Wire representation keeps the human-readable names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceCategory {
    #[serde(rename = "Mechanical Service")]
    Mechanical,
    #[serde(rename = "Electrical Service")]
    Electrical,
    #[serde(rename = "Car Wash & Detailing")]
    CarWashDetailing,
    #[serde(rename = "Battery Service")]
    Battery,
    #[serde(rename = "Tyre Service")]
    Tyre,
}

impl ServiceCategory {
    /// Wire/storage name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Mechanical => "Mechanical Service",
            ServiceCategory::Electrical => "Electrical Service",
            ServiceCategory::CarWashDetailing => "Car Wash & Detailing",
            ServiceCategory::Battery => "Battery Service",
            ServiceCategory::Tyre => "Tyre Service",
        }
    }
}

/// Who performed an action on a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Actor {
    Customer,
    Vendor,
    System,
}

/// A WGS84 coordinate pair, `lng` first to match the stored layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

/// Mean Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Reject coordinates outside the valid WGS84 ranges.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(AppError::Validation(format!(
                "longitude {} out of range [-180, 180]",
                self.lng
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(AppError::Validation(format!(
                "latitude {} out of range [-90, 90]",
                self.lat
            )));
        }
        Ok(())
    }

    /// Great-circle (haversine) distance to `other` in kilometers.
    ///
    /// The same formula backs the `haversine_distance` SQL function used for
    /// eligibility queries, so ranking and candidate selection agree on one
    /// distance model.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let dlat = (other.lat - self.lat).to_radians();
        let dlng = (other.lng - self.lng).to_radians();
        let a = (dlat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (dlng / 2.0).sin().powi(2);
        EARTH_RADIUS_KM * 2.0 * a.sqrt().asin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        let json = serde_json::to_string(&ServiceCategory::Battery).unwrap();
        assert_eq!(json, "\"Battery Service\"");
        let back: ServiceCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ServiceCategory::Battery);
    }

    #[test]
    fn test_actor_wire_names() {
        assert_eq!(serde_json::to_string(&Actor::Customer).unwrap(), "\"CUSTOMER\"");
        assert_eq!(serde_json::to_string(&Actor::System).unwrap(), "\"SYSTEM\"");
    }

    #[test]
    fn test_distance_zero_for_same_point() {
        let p = GeoPoint::new(77.59, 12.97);
        assert!(p.distance_km(&p) < 1e-9);
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        // One degree of latitude is ~111 km everywhere
        let a = GeoPoint::new(77.0, 12.0);
        let b = GeoPoint::new(77.0, 13.0);
        let d = a.distance_km(&b);
        assert!((d - 111.2).abs() < 1.0, "got {d}");
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(GeoPoint::new(181.0, 0.0).validate().is_err());
        assert!(GeoPoint::new(0.0, -91.0).validate().is_err());
        assert!(GeoPoint::new(180.0, 90.0).validate().is_ok());
    }
}
