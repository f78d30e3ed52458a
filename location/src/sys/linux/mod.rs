//! Linux location backend using the GeoClue2 D-Bus service.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_channel::{Receiver, Sender};
use futures::executor::block_on;
use futures::future::{self, Either};
use futures::{StreamExt, pin_mut};
use geokit_permission::{AuthorizationLevel, AuthorizationStatus};
use log::{debug, warn};
use zbus::zvariant::OwnedObjectPath;
use zbus::{Connection, Message, Proxy};

use super::sink::{Sink, lock};
use crate::{
    DesiredAccuracy, Location, LocationBackend, LocationDelegate, LocationError, now_millis,
};

const SERVICE: &str = "org.freedesktop.GeoClue2";
const MANAGER_PATH: &str = "/org/freedesktop/GeoClue2/Manager";
const MANAGER_IFACE: &str = "org.freedesktop.GeoClue2.Manager";
const CLIENT_IFACE: &str = "org.freedesktop.GeoClue2.Client";
const LOCATION_IFACE: &str = "org.freedesktop.GeoClue2.Location";

const DEFAULT_DESKTOP_ID: &str = "geokit";

// How long a one-shot request waits for GeoClue's first fix.
const FIX_TIMEOUT: Duration = Duration::from_secs(60);

// GClueAccuracyLevel
const fn accuracy_level(accuracy: DesiredAccuracy) -> u32 {
    match accuracy {
        DesiredAccuracy::BestForNavigation
        | DesiredAccuracy::Best
        | DesiredAccuracy::NearestTenMeters => 8,
        DesiredAccuracy::HundredMeters => 6,
        DesiredAccuracy::Kilometer => 5,
        DesiredAccuracy::ThreeKilometers => 4,
    }
}

/// Backend talking to GeoClue2 over the system bus.
///
/// Every one-shot request and every tracking session runs its own GeoClue
/// client on a worker thread. Each session owns a stop channel: closing it
/// stops the client, and a one-shot request that sees no fix within a minute
/// reports [`LocationError::Timeout`].
pub struct GeoClueBackend {
    desktop_id: String,
    accuracy: Mutex<DesiredAccuracy>,
    last_status: Mutex<Option<AuthorizationStatus>>,
    watcher: Mutex<Option<Sender<()>>>,
    one_shots: Mutex<Vec<Sender<()>>>,
    sink: Sink,
}

impl fmt::Debug for GeoClueBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoClueBackend")
            .field("desktop_id", &self.desktop_id)
            .field("accuracy", &*lock(&self.accuracy))
            .field("tracking", &lock(&self.watcher).is_some())
            .field("one_shots", &lock(&self.one_shots).len())
            .finish_non_exhaustive()
    }
}

impl Default for GeoClueBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoClueBackend {
    /// Creates a backend identifying itself to GeoClue as `geokit`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_desktop_id(DEFAULT_DESKTOP_ID)
    }

    /// Creates a backend with the given desktop ID. GeoClue's agent uses it to
    /// look up the application's permissions.
    #[must_use]
    pub fn with_desktop_id(desktop_id: impl Into<String>) -> Self {
        Self {
            desktop_id: desktop_id.into(),
            accuracy: Mutex::new(DesiredAccuracy::default()),
            last_status: Mutex::new(None),
            watcher: Mutex::new(None),
            one_shots: Mutex::new(Vec::new()),
            sink: Sink::default(),
        }
    }

    fn spawn_session(&self, stop: Receiver<()>, one_shot: bool) {
        let desktop_id = self.desktop_id.clone();
        let accuracy = *lock(&self.accuracy);
        let sink = self.sink.clone();

        thread::spawn(move || {
            if let Err(e) = block_on(run_session(&desktop_id, accuracy, &sink, &stop, one_shot)) {
                sink.fail(LocationError::Unknown(format!("GeoClue session failed: {e}")));
            }
        });
    }
}

impl LocationBackend for GeoClueBackend {
    fn set_delegate(&self, delegate: Arc<dyn LocationDelegate>) {
        self.sink.set_delegate(delegate);
        *lock(&self.last_status) = Some(geokit_permission::status());
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        geokit_permission::status()
    }

    fn location_services_enabled(&self) -> bool {
        match block_on(available_accuracy_level()) {
            Ok(level) => level > 0,
            Err(e) => {
                debug!("GeoClue not available: {e}");
                false
            }
        }
    }

    fn request_authorization(&self, level: AuthorizationLevel) {
        let status = match block_on(geokit_permission::request(level)) {
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
        let (stop_tx, stop_rx) = async_channel::bounded(1);
        {
            let mut one_shots = lock(&self.one_shots);
            one_shots.retain(|stop| !stop.is_closed());
            one_shots.push(stop_tx.clone());
        }
        arm_fix_timeout(stop_tx, FIX_TIMEOUT);

        self.spawn_session(stop_rx, true);
    }

    fn set_allows_background_updates(&self, allow: bool) {
        // No effect: GeoClue keeps delivering to any connected client.
        debug!("background updates allowed: {allow}");
    }

    fn set_desired_accuracy(&self, accuracy: DesiredAccuracy) {
        *lock(&self.accuracy) = accuracy;
    }

    fn start_updates(&self) {
        let mut watcher = lock(&self.watcher);
        if watcher.is_some() {
            return;
        }
        let (stop_tx, stop_rx) = async_channel::bounded(1);
        *watcher = Some(stop_tx);
        drop(watcher);

        self.spawn_session(stop_rx, false);
    }

    /// Ends the tracking session and any one-shot request still waiting for
    /// its first fix.
    fn stop_updates(&self) {
        // Closing a channel wakes its session, which then stops its client.
        if let Some(stop) = lock(&self.watcher).take() {
            stop.close();
        }
        for stop in lock(&self.one_shots).drain(..) {
            stop.close();
        }
    }

    fn last_location(&self) -> Option<Location> {
        self.sink.last_location()
    }
}

impl Drop for GeoClueBackend {
    fn drop(&mut self) {
        self.stop_updates();
    }
}

/// Signals `stop` once `after` has passed. A session that receives the signal
/// instead of a close reports a timeout.
fn arm_fix_timeout(stop: Sender<()>, after: Duration) {
    thread::spawn(move || {
        thread::sleep(after);
        // Fails once the session is over.
        let _ = stop.try_send(());
    });
}

async fn available_accuracy_level() -> zbus::Result<u32> {
    let connection = Connection::system().await?;
    let manager = Proxy::new(&connection, SERVICE, MANAGER_PATH, MANAGER_IFACE).await?;
    manager.get_property("AvailableAccuracyLevel").await
}

/// Runs one GeoClue client until `stop` fires. A one-shot session also ends
/// after the first fix.
async fn run_session(
    desktop_id: &str,
    accuracy: DesiredAccuracy,
    sink: &Sink,
    stop: &Receiver<()>,
    one_shot: bool,
) -> zbus::Result<()> {
    let connection = Connection::system().await?;

    let manager = Proxy::new(&connection, SERVICE, MANAGER_PATH, MANAGER_IFACE).await?;
    let client_path: OwnedObjectPath = manager.call("GetClient", &()).await?;
    let client = Proxy::new(&connection, SERVICE, client_path.as_str(), CLIENT_IFACE).await?;

    // Required by GeoClue before Start
    client.set_property("DesktopId", desktop_id).await?;
    client
        .set_property("RequestedAccuracyLevel", accuracy_level(accuracy))
        .await?;

    // Subscribe before starting so the first fix is not missed.
    let updates = client.receive_signal("LocationUpdated").await?;
    pin_mut!(updates);
    client.call_method("Start", &()).await?;
    debug!("GeoClue client started (accuracy level {})", accuracy_level(accuracy));

    loop {
        let next = updates.next();
        let halt = stop.recv();
        pin_mut!(next, halt);

        match future::select(next, halt).await {
            Either::Left((Some(message), _)) => {
                match location_from_signal(&connection, &message).await {
                    Ok(location) => sink.deliver(location),
                    Err(e) => sink.fail(LocationError::Unknown(format!(
                        "failed to read location: {e}"
                    ))),
                }
                if one_shot {
                    break;
                }
            }
            Either::Right((Ok(()), _)) => {
                sink.fail(LocationError::Timeout);
                break;
            }
            _ => break,
        }
    }

    client.call_method("Stop", &()).await?;
    debug!("GeoClue client stopped");
    Ok(())
}

async fn location_from_signal(connection: &Connection, message: &Message) -> zbus::Result<Location> {
    let (_old, new): (OwnedObjectPath, OwnedObjectPath) = message.body().deserialize()?;
    let location = Proxy::new(connection, SERVICE, new.as_str(), LOCATION_IFACE).await?;

    let latitude: f64 = location.get_property("Latitude").await?;
    let longitude: f64 = location.get_property("Longitude").await?;
    let accuracy = location.get_property::<f64>("Accuracy").await.ok();
    // GeoClue reports -DBL_MAX for an unknown altitude.
    let altitude = location
        .get_property::<f64>("Altitude")
        .await
        .ok()
        .filter(|a| *a > f64::MIN);

    Ok(Location {
        latitude,
        longitude,
        altitude,
        horizontal_accuracy: accuracy,
        vertical_accuracy: None,
        timestamp: now_millis(),
    })
}
