//! Backend for platforms without a location service.

use std::fmt;
use std::sync::Arc;

use geokit_permission::{AuthorizationLevel, AuthorizationStatus};
use log::debug;

use super::sink::Sink;
use crate::{DesiredAccuracy, Location, LocationBackend, LocationDelegate, LocationError};

/// Reports location services as disabled and never produces a location.
#[derive(Default)]
pub struct UnsupportedBackend {
    sink: Sink,
}

impl fmt::Debug for UnsupportedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnsupportedBackend").finish()
    }
}

impl LocationBackend for UnsupportedBackend {
    fn set_delegate(&self, delegate: Arc<dyn LocationDelegate>) {
        self.sink.set_delegate(delegate);
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        AuthorizationStatus::NotDetermined
    }

    fn location_services_enabled(&self) -> bool {
        false
    }

    fn request_authorization(&self, level: AuthorizationLevel) {
        debug!("ignoring {level:?} authorization request on an unsupported platform");
    }

    fn request_location(&self) {
        self.sink.fail(LocationError::ServiceDisabled);
    }

    fn set_allows_background_updates(&self, _allow: bool) {}

    fn set_desired_accuracy(&self, _accuracy: DesiredAccuracy) {}

    fn start_updates(&self) {}

    fn stop_updates(&self) {}

    fn last_location(&self) -> Option<Location> {
        self.sink.last_location()
    }
}
