use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::warn;

use crate::{Location, LocationDelegate, LocationError};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Where a platform backend reports its results. Cheap to clone into worker
/// threads and platform callbacks.
#[derive(Clone, Default)]
pub(crate) struct Sink {
    delegate: Arc<Mutex<Option<Arc<dyn LocationDelegate>>>>,
    last_location: Arc<Mutex<Option<Location>>>,
}

impl Sink {
    pub(crate) fn set_delegate(&self, delegate: Arc<dyn LocationDelegate>) {
        *lock(&self.delegate) = Some(delegate);
    }

    pub(crate) fn delegate(&self) -> Option<Arc<dyn LocationDelegate>> {
        lock(&self.delegate).clone()
    }

    pub(crate) fn last_location(&self) -> Option<Location> {
        lock(&self.last_location).clone()
    }

    /// Caches `location` as the last known one and hands it to the delegate.
    pub(crate) fn deliver(&self, location: Location) {
        *lock(&self.last_location) = Some(location.clone());
        if let Some(delegate) = self.delegate() {
            delegate.on_locations(vec![location]);
        }
    }

    pub(crate) fn fail(&self, error: LocationError) {
        match self.delegate() {
            Some(delegate) => delegate.on_error(error),
            None => warn!("location error with no delegate: {error}"),
        }
    }
}
