use std::fmt;
use std::sync::Arc;

use geokit_permission::{AuthorizationLevel, AuthorizationStatus};

use crate::{DesiredAccuracy, Location, LocationError};

/// Receives callbacks from a [`LocationBackend`].
///
/// Backends may call these from any thread.
pub trait LocationDelegate: Send + Sync {
    /// A batch of location fixes arrived, oldest first.
    fn on_locations(&self, locations: Vec<Location>);

    /// The platform failed to deliver a location.
    fn on_error(&self, error: LocationError);

    /// The authorization status changed.
    fn on_authorization_changed(&self, status: AuthorizationStatus);
}

/// The platform location service as seen by [`crate::LocationManager`].
///
/// Every method forwards to the platform; none of them block waiting for a fix.
/// Results of asynchronous requests come back through the registered
/// [`LocationDelegate`].
pub trait LocationBackend: Send + Sync + fmt::Debug {
    /// Registers the delegate that receives platform callbacks.
    fn set_delegate(&self, delegate: Arc<dyn LocationDelegate>);

    /// Current authorization status.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Whether the device-wide location service is switched on.
    fn location_services_enabled(&self) -> bool;

    /// Asks the user for the given authorization level.
    fn request_authorization(&self, level: AuthorizationLevel);

    /// Requests a single location fix.
    fn request_location(&self);

    /// Allows or forbids updates while the application is in the background.
    fn set_allows_background_updates(&self, allow: bool);

    /// Sets the accuracy the platform should aim for.
    fn set_desired_accuracy(&self, accuracy: DesiredAccuracy);

    /// Starts continuous location updates.
    fn start_updates(&self);

    /// Stops continuous location updates.
    fn stop_updates(&self);

    /// The most recently obtained location, if any.
    fn last_location(&self) -> Option<Location>;
}
