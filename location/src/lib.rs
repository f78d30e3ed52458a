//! Cross-platform location access.
//!
//! This crate wraps the platform location service behind a single
//! [`LocationManager`] facade: authorization checks, start/stop tracking,
//! last-known location, distance computation and reverse geocoding. Updates are
//! published as [`LocationEvent`] values to every subscriber.
//!
//! The platform is reached through the [`LocationBackend`] trait, so the facade
//! can be built over a substitute backend in tests.

#![warn(missing_docs)]

mod backend;
mod distance;
mod events;
mod geocode;
mod manager;

/// Platform-specific implementations.
pub mod sys;

pub use backend::{LocationBackend, LocationDelegate};
pub use distance::{EARTH_RADIUS_M, METERS_TO_MILES, convert_distance, haversine_distance};
pub use events::{EventBus, LocationEvent};
pub use geocode::{GeocodeCompletion, Geocoder, NominatimConfig, NominatimGeocoder, Placemark};
pub use geokit_permission::{AuthorizationLevel, AuthorizationStatus};
pub use manager::LocationManager;

use serde::{Deserialize, Serialize};

/// A geographic location with coordinates and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
    /// Altitude in meters above sea level, if available.
    pub altitude: Option<f64>,
    /// Horizontal accuracy in meters, if available.
    pub horizontal_accuracy: Option<f64>,
    /// Vertical accuracy in meters, if available.
    pub vertical_accuracy: Option<f64>,
    /// Timestamp as Unix epoch milliseconds.
    pub timestamp: u64,
}

impl Location {
    /// Creates a location fixed at the current time, without altitude or accuracy.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            horizontal_accuracy: None,
            vertical_accuracy: None,
            timestamp: now_millis(),
        }
    }

    /// Great-circle distance to `other`, in meters.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        haversine_distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Errors that can occur when accessing location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// Location permission was not granted.
    #[error("location permission denied")]
    PermissionDenied,
    /// Location services are disabled on the device.
    #[error("location services disabled")]
    ServiceDisabled,
    /// Location request timed out.
    #[error("location request timed out")]
    Timeout,
    /// Location is not available.
    #[error("location not available")]
    NotAvailable,
    /// Reverse geocoding failed.
    #[error("geocoding failed: {0}")]
    Geocoding(String),
    /// An unknown error occurred.
    #[error("unknown error: {0}")]
    Unknown(String),
}

/// Convenience alias for results returned by backends.
pub type LocationResult<T> = Result<T, LocationError>;

/// Accuracy the platform should aim for while tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesiredAccuracy {
    /// Highest accuracy, supplemented by additional sensor data.
    #[default]
    BestForNavigation,
    /// Highest accuracy the hardware offers.
    Best,
    /// Within about ten meters.
    NearestTenMeters,
    /// Within about one hundred meters.
    HundredMeters,
    /// Within about a kilometer.
    Kilometer,
    /// Within about three kilometers.
    ThreeKilometers,
}

/// How [`LocationManager::start_tracking_location`] configures the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Keep delivering updates while the application is in the background.
    pub allows_background_updates: bool,
    /// Accuracy requested from the platform.
    pub desired_accuracy: DesiredAccuracy,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            allows_background_updates: true,
            desired_accuracy: DesiredAccuracy::BestForNavigation,
        }
    }
}

pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_config_defaults_to_navigation_in_background() {
        let config = TrackingConfig::default();
        assert!(config.allows_background_updates);
        assert_eq!(config.desired_accuracy, DesiredAccuracy::BestForNavigation);
    }

    #[test]
    fn tracking_config_fills_missing_fields() {
        let config: TrackingConfig =
            serde_json::from_str(r#"{"desired_accuracy":"hundred_meters"}"#).unwrap();
        assert!(config.allows_background_updates);
        assert_eq!(config.desired_accuracy, DesiredAccuracy::HundredMeters);
    }

    #[test]
    fn new_location_is_stamped() {
        let location = Location::new(51.5, -0.12);
        assert!(location.timestamp > 0);
        assert_eq!(location.altitude, None);
    }
}
