use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_channel::{Receiver, Sender, TrySendError, unbounded};
use geokit_permission::AuthorizationStatus;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::{Location, LocationDelegate, LocationError};

/// An event published by [`crate::LocationManager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocationEvent {
    /// A new location fix, the newest of the batch the platform delivered.
    LocationUpdated(Location),
    /// The authorization status changed.
    AuthorizationChanged(AuthorizationStatus),
}

/// Fan-out of [`LocationEvent`]s to any number of subscribers.
///
/// Delivery is fire and forget: subscribers that went away are dropped on the
/// next publish, and nothing is buffered for subscribers that join later.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<LocationEvent>>>,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber and returns its receiving end.
    pub fn subscribe(&self) -> Receiver<LocationEvent> {
        let (sender, receiver) = unbounded();
        self.lock().push(sender);
        receiver
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|s| !s.is_closed());
        subscribers.len()
    }

    /// Sends `event` to every live subscriber.
    pub fn publish(&self, event: &LocationEvent) {
        self.lock().retain(|sender| match sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Closed(_)) => false,
            Err(TrySendError::Full(_)) => {
                warn!("dropping location event for a full subscriber");
                true
            }
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sender<LocationEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.lock().len())
            .finish()
    }
}

/// Delegate installed on the backend; turns platform callbacks into events.
pub(crate) struct EventRelay {
    bus: Arc<EventBus>,
}

impl EventRelay {
    pub(crate) const fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl fmt::Debug for EventRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRelay").finish()
    }
}

impl LocationDelegate for EventRelay {
    fn on_locations(&self, locations: Vec<Location>) {
        // Batches are ordered oldest first.
        if let Some(latest) = locations.into_iter().last() {
            debug!(
                "location updated: {:.6}, {:.6}",
                latest.latitude, latest.longitude
            );
            self.bus.publish(&LocationEvent::LocationUpdated(latest));
        }
    }

    fn on_error(&self, err: LocationError) {
        error!("location manager error: {err}");
    }

    fn on_authorization_changed(&self, status: AuthorizationStatus) {
        debug!("authorization changed: {status:?}");
        self.bus.publish(&LocationEvent::AuthorizationChanged(status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives_the_event() {
        let bus = EventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        let event = LocationEvent::AuthorizationChanged(AuthorizationStatus::Denied);
        bus.publish(&event);

        assert_eq!(first.try_recv().unwrap(), event);
        assert_eq!(second.try_recv().unwrap(), event);
    }

    #[test]
    fn closed_subscribers_are_pruned() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(&LocationEvent::AuthorizationChanged(
            AuthorizationStatus::AuthorizedAlways,
        ));
        assert_eq!(bus.lock().len(), 1);
        assert!(kept.try_recv().is_ok());
    }

    #[test]
    fn relay_publishes_newest_of_batch() {
        let bus = Arc::new(EventBus::new());
        let events = bus.subscribe();
        let relay = EventRelay::new(bus);

        relay.on_locations(vec![Location::new(1.0, 1.0), Location::new(2.0, 2.0)]);
        match events.try_recv().unwrap() {
            LocationEvent::LocationUpdated(location) => {
                assert!((location.latitude - 2.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn relay_ignores_empty_batches_and_errors() {
        let bus = Arc::new(EventBus::new());
        let events = bus.subscribe();
        let relay = EventRelay::new(bus);

        relay.on_locations(Vec::new());
        relay.on_error(LocationError::Timeout);
        assert!(events.try_recv().is_err());
    }
}
