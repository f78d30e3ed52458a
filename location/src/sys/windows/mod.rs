//! Windows location backend using WinRT Geolocator.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread;

use geokit_permission::{AuthorizationLevel, AuthorizationStatus};
use log::{debug, warn};
use windows::Devices::Geolocation::{
    Geolocator, Geoposition, PositionAccuracy, PositionChangedEventArgs, PositionStatus,
};
use windows::Foundation::TypedEventHandler;

use super::sink::{Sink, lock};
use crate::{DesiredAccuracy, Location, LocationBackend, LocationDelegate, LocationError};

// 100ns ticks between 1601-01-01 and 1970-01-01
const UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;

const fn position_accuracy(accuracy: DesiredAccuracy) -> PositionAccuracy {
    match accuracy {
        DesiredAccuracy::BestForNavigation
        | DesiredAccuracy::Best
        | DesiredAccuracy::NearestTenMeters => PositionAccuracy::High,
        _ => PositionAccuracy::Default,
    }
}

fn platform_error(e: &windows::core::Error) -> LocationError {
    LocationError::Unknown(e.message().to_string())
}

fn location_from_position(position: &Geoposition) -> windows::core::Result<Location> {
    let coord = position.Coordinate()?;
    let pos = coord.Point()?.Position()?;

    let ticks = coord.Timestamp()?.UniversalTime;
    let timestamp = u64::try_from((ticks - UNIX_EPOCH_TICKS) / 10_000).unwrap_or(0);

    Ok(Location {
        latitude: pos.Latitude,
        longitude: pos.Longitude,
        altitude: Some(pos.Altitude),
        horizontal_accuracy: coord.Accuracy().ok(),
        vertical_accuracy: coord.AltitudeAccuracy().ok().and_then(|a| a.Value().ok()),
        timestamp,
    })
}

struct Tracking {
    geolocator: Geolocator,
    token: i64,
}

/// Backend over `Windows.Devices.Geolocation`.
pub struct WindowsBackend {
    accuracy: Mutex<DesiredAccuracy>,
    last_status: Mutex<Option<AuthorizationStatus>>,
    tracking: Mutex<Option<Tracking>>,
    sink: Sink,
}

impl fmt::Debug for WindowsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowsBackend")
            .field("accuracy", &*lock(&self.accuracy))
            .field("tracking", &lock(&self.tracking).is_some())
            .finish_non_exhaustive()
    }
}

impl Default for WindowsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowsBackend {
    /// Creates a backend; no WinRT object is created until it is needed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accuracy: Mutex::new(DesiredAccuracy::default()),
            last_status: Mutex::new(None),
            tracking: Mutex::new(None),
            sink: Sink::default(),
        }
    }

    fn geolocator(&self) -> windows::core::Result<Geolocator> {
        let geolocator = Geolocator::new()?;
        geolocator.SetDesiredAccuracy(position_accuracy(*lock(&self.accuracy)))?;
        Ok(geolocator)
    }

    fn subscribe(&self) -> windows::core::Result<Tracking> {
        let geolocator = self.geolocator()?;
        let sink = self.sink.clone();

        let handler = TypedEventHandler::<Geolocator, PositionChangedEventArgs>::new(
            move |_, args| {
                let position = args.ok().and_then(PositionChangedEventArgs::Position);
                match position.and_then(|p| location_from_position(&p)) {
                    Ok(location) => sink.deliver(location),
                    Err(e) => sink.fail(platform_error(&e)),
                }
                Ok(())
            },
        );
        let token = geolocator.PositionChanged(&handler)?;

        Ok(Tracking { geolocator, token })
    }
}

impl LocationBackend for WindowsBackend {
    fn set_delegate(&self, delegate: Arc<dyn LocationDelegate>) {
        self.sink.set_delegate(delegate);
        *lock(&self.last_status) = Some(geokit_permission::status());
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        geokit_permission::status()
    }

    fn location_services_enabled(&self) -> bool {
        match Geolocator::new().and_then(|g| g.LocationStatus()) {
            Ok(status) => {
                status != PositionStatus::Disabled && status != PositionStatus::NotAvailable
            }
            Err(e) => {
                debug!("geolocator not available: {}", e.message());
                false
            }
        }
    }

    fn request_authorization(&self, level: AuthorizationLevel) {
        let status = match futures::executor::block_on(geokit_permission::request(level)) {
            Ok(status) => status,
            Err(e) => {
                warn!("authorization request failed: {e}");
                return;
            }
        };

        let changed = lock(&self.last_status).replace(status) != Some(status);
        if changed {
            if let Some(delegate) = self.sink.delegate() {
                delegate.on_authorization_changed(status);
            }
        }
    }

    fn request_location(&self) {
        let geolocator = match self.geolocator() {
            Ok(geolocator) => geolocator,
            Err(e) => {
                self.sink.fail(platform_error(&e));
                return;
            }
        };
        let sink = self.sink.clone();

        thread::spawn(move || {
            let result = geolocator
                .GetGeopositionAsync()
                .and_then(|op| op.get())
                .and_then(|p| location_from_position(&p));
            match result {
                Ok(location) => sink.deliver(location),
                Err(e) => sink.fail(platform_error(&e)),
            }
        });
    }

    fn set_allows_background_updates(&self, allow: bool) {
        // No effect: desktop applications are not suspended.
        debug!("background updates allowed: {allow}");
    }

    fn set_desired_accuracy(&self, accuracy: DesiredAccuracy) {
        *lock(&self.accuracy) = accuracy;
    }

    fn start_updates(&self) {
        let mut tracking = lock(&self.tracking);
        if tracking.is_some() {
            return;
        }
        match self.subscribe() {
            Ok(subscription) => *tracking = Some(subscription),
            Err(e) => self.sink.fail(platform_error(&e)),
        }
    }

    fn stop_updates(&self) {
        if let Some(Tracking { geolocator, token }) = lock(&self.tracking).take() {
            if let Err(e) = geolocator.RemovePositionChanged(token) {
                warn!("failed to remove position handler: {}", e.message());
            }
        }
    }

    fn last_location(&self) -> Option<Location> {
        self.sink.last_location()
    }
}
