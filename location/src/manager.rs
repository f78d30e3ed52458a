use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use async_channel::Receiver;
use futures::channel::oneshot;
use geokit_permission::{AuthorizationLevel, AuthorizationStatus};
use log::{debug, error, info, warn};

use crate::events::EventRelay;
use crate::{
    EventBus, Geocoder, Location, LocationBackend, LocationEvent, NominatimGeocoder, Placemark,
    TrackingConfig, convert_distance,
};

/// Facade over the platform location service.
///
/// Wraps one [`LocationBackend`] and one [`Geocoder`], and republishes platform
/// callbacks as [`LocationEvent`]s to every subscriber.
pub struct LocationManager {
    backend: Arc<dyn LocationBackend>,
    geocoder: Arc<dyn Geocoder>,
    config: TrackingConfig,
    tracking: AtomicBool,
    events: Arc<EventBus>,
}

impl fmt::Debug for LocationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationManager")
            .field("backend", &self.backend)
            .field("geocoder", &self.geocoder)
            .field("config", &self.config)
            .field("tracking", &self.is_tracking_location())
            .finish_non_exhaustive()
    }
}

impl LocationManager {
    /// Creates a manager over the given backend and geocoder and installs itself
    /// as the backend's delegate.
    pub fn new(backend: Arc<dyn LocationBackend>, geocoder: Arc<dyn Geocoder>) -> Self {
        Self::with_config(backend, geocoder, TrackingConfig::default())
    }

    /// Like [`LocationManager::new`], with a custom tracking configuration.
    pub fn with_config(
        backend: Arc<dyn LocationBackend>,
        geocoder: Arc<dyn Geocoder>,
        config: TrackingConfig,
    ) -> Self {
        let events = Arc::new(EventBus::new());
        backend.set_delegate(Arc::new(EventRelay::new(events.clone())));

        Self {
            backend,
            geocoder,
            config,
            tracking: AtomicBool::new(false),
            events,
        }
    }

    /// Process-wide manager over the host platform's backend and a Nominatim
    /// geocoder, created on first access.
    pub fn shared() -> &'static Self {
        static SHARED: OnceLock<LocationManager> = OnceLock::new();
        SHARED.get_or_init(|| {
            Self::new(
                crate::sys::default_backend(),
                Arc::new(NominatimGeocoder::default()),
            )
        })
    }

    /// Subscribes to location and authorization events.
    ///
    /// Events published before the call are not replayed.
    pub fn subscribe(&self) -> Receiver<LocationEvent> {
        self.events.subscribe()
    }

    /// The tracking configuration applied by [`Self::start_tracking_location`].
    #[must_use]
    pub const fn config(&self) -> &TrackingConfig {
        &self.config
    }

    // Authorization

    /// Asks the user for location access at any time.
    pub fn request_always_authorization(&self) {
        self.backend.request_authorization(AuthorizationLevel::Always);
    }

    /// Asks the user for location access while the application is in use.
    pub fn request_when_in_use_authorization(&self) {
        self.backend
            .request_authorization(AuthorizationLevel::WhenInUse);
    }

    /// Current authorization status as reported by the platform.
    #[must_use]
    pub fn authorization_status(&self) -> AuthorizationStatus {
        self.backend.authorization_status()
    }

    /// Whether the device-wide location service is switched on.
    #[must_use]
    pub fn location_services_enabled(&self) -> bool {
        self.backend.location_services_enabled()
    }

    /// Whether the application holds either level of location access.
    #[must_use]
    pub fn is_app_authorized(&self) -> bool {
        self.authorization_status().is_authorized()
    }

    /// Whether the application holds "always" location access.
    #[must_use]
    pub fn is_app_always_authorized(&self) -> bool {
        self.authorization_status().is_always()
    }

    /// Whether the application holds "when in use" location access.
    #[must_use]
    pub fn is_app_when_in_use_authorized(&self) -> bool {
        self.authorization_status().is_when_in_use()
    }

    // Location and distance

    /// Configures the backend and starts continuous updates, requesting
    /// authorization along the way. Does nothing if already tracking.
    pub fn start_tracking_location(&self) {
        if self
            .tracking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("already tracking location");
            return;
        }

        self.backend.request_location();
        self.backend
            .request_authorization(AuthorizationLevel::WhenInUse);
        self.backend.request_authorization(AuthorizationLevel::Always);

        self.backend
            .set_allows_background_updates(self.config.allows_background_updates);
        self.backend
            .set_desired_accuracy(self.config.desired_accuracy);

        self.backend.start_updates();
        info!("started tracking location");
    }

    /// Stops continuous updates. Does nothing if not tracking.
    pub fn stop_tracking_location(&self) {
        if self
            .tracking
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.backend.stop_updates();
            info!("stopped tracking location");
        }
    }

    /// Whether continuous updates are running.
    #[must_use]
    pub fn is_tracking_location(&self) -> bool {
        self.tracking.load(Ordering::Acquire)
    }

    /// The platform's last known location.
    #[must_use]
    pub fn current_location(&self) -> Option<Location> {
        self.backend.last_location()
    }

    /// Distance from the current location to `to`.
    ///
    /// Returns `None` if either location is unavailable. The conversion follows
    /// [`convert_distance`]: meters scaled by 0.621371 unless `in_miles` is set,
    /// in which case raw meters are returned.
    #[must_use]
    pub fn distance_from_current_location(
        &self,
        to: Option<&Location>,
        in_miles: bool,
    ) -> Option<f64> {
        let to = to?;
        let current = self.current_location()?;
        Some(convert_distance(current.distance_to(to), in_miles))
    }

    /// Distance between two locations, with the same conversion and `None`
    /// handling as [`Self::distance_from_current_location`].
    #[must_use]
    pub fn distance(
        &self,
        from: Option<&Location>,
        to: Option<&Location>,
        in_miles: bool,
    ) -> Option<f64> {
        let (from, to) = (from?, to?);
        Some(convert_distance(to.distance_to(from), in_miles))
    }

    // Reverse geocoding

    /// Reverse geocodes the current location.
    ///
    /// The completion only runs when location services are enabled, the
    /// application is authorized and a current location is known; otherwise the
    /// reason is logged and the completion is dropped.
    pub fn get_address<F>(&self, completion: F)
    where
        F: FnOnce(Vec<Placemark>) + Send + 'static,
    {
        if !self.location_services_enabled() {
            warn!("location services are not enabled");
            return;
        }

        let status = self.authorization_status();
        if !status.is_authorized() {
            warn!("no location access ({status:?})");
            return;
        }

        info!("location access granted ({status:?})");
        self.request_when_in_use_authorization();
        if !self.is_app_authorized() {
            return;
        }

        match self.current_location() {
            Some(location) => self.get_address_for(&location, completion),
            None => debug!("no current location to geocode"),
        }
    }

    /// Reverse geocodes `location`.
    ///
    /// The completion receives the placemarks, or an empty list if geocoding
    /// failed.
    pub fn get_address_for<F>(&self, location: &Location, completion: F)
    where
        F: FnOnce(Vec<Placemark>) + Send + 'static,
    {
        self.geocoder.reverse_geocode(
            location,
            Box::new(move |result| match result {
                Ok(placemarks) => completion(placemarks),
                Err(err) => {
                    error!("error getting location: {err}");
                    completion(Vec::new());
                }
            }),
        );
    }

    /// Async form of [`Self::get_address_for`].
    pub async fn reverse_geocode(&self, location: &Location) -> Vec<Placemark> {
        let (sender, receiver) = oneshot::channel();
        self.get_address_for(location, move |placemarks| {
            let _ = sender.send(placemarks);
        });
        receiver.await.unwrap_or_default()
    }
}
