//! Linux authorization implementation.
//!
//! GeoClue grants location to any client that can reach its D-Bus service, so
//! there is no runtime prompt on a traditional desktop. Sandboxed applications
//! (Flatpak) go through the `org.freedesktop.portal.Location` portal instead,
//! which asks the user and only hands out access while the application runs.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use futures::{StreamExt, pin_mut};
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};
use zbus::{Connection, Proxy};

use crate::{AuthorizationLevel, AuthorizationStatus, PermissionError};

const PORTAL_SERVICE: &str = "org.freedesktop.portal.Desktop";
const PORTAL_PATH: &str = "/org/freedesktop/portal/desktop";
const LOCATION_IFACE: &str = "org.freedesktop.portal.Location";
const REQUEST_IFACE: &str = "org.freedesktop.portal.Request";
const SESSION_IFACE: &str = "org.freedesktop.portal.Session";

// The portal's answer for this process, once the user has given one.
static GRANT: Mutex<Option<AuthorizationStatus>> = Mutex::new(None);

fn sandboxed() -> bool {
    std::env::var_os("FLATPAK_ID").is_some() || std::path::Path::new("/.flatpak-info").exists()
}

fn recorded_grant() -> Option<AuthorizationStatus> {
    *GRANT.lock().unwrap_or_else(PoisonError::into_inner)
}

fn record_grant(status: AuthorizationStatus) {
    *GRANT.lock().unwrap_or_else(PoisonError::into_inner) = Some(status);
}

const fn status_for(sandboxed: bool, grant: Option<AuthorizationStatus>) -> AuthorizationStatus {
    match (sandboxed, grant) {
        (false, _) => AuthorizationStatus::AuthorizedAlways,
        (true, Some(status)) => status,
        (true, None) => AuthorizationStatus::NotDetermined,
    }
}

// Request.Response codes: 0 success, 1 cancelled by the user, 2 ended otherwise.
const fn status_from_response(code: u32) -> AuthorizationStatus {
    match code {
        0 => AuthorizationStatus::AuthorizedWhenInUse,
        1 => AuthorizationStatus::Denied,
        _ => AuthorizationStatus::NotDetermined,
    }
}

/// Object path the portal uses for a request made with `token`.
fn request_path(unique_name: &str, token: &str) -> String {
    let sender = unique_name.trim_start_matches(':').replace('.', "_");
    format!("{PORTAL_PATH}/request/{sender}/{token}")
}

pub(crate) fn status() -> AuthorizationStatus {
    status_for(sandboxed(), recorded_grant())
}

pub(crate) async fn request(
    level: AuthorizationLevel,
) -> Result<AuthorizationStatus, PermissionError> {
    if !sandboxed() {
        return Ok(AuthorizationStatus::AuthorizedAlways);
    }

    if level == AuthorizationLevel::Always {
        log::warn!("sandboxed applications cannot hold background location access");
    }
    if let Some(status) = recorded_grant() {
        return Ok(status);
    }

    let code = ask_portal()
        .await
        .map_err(|e| PermissionError::Unknown(format!("location portal: {e}")))?;
    let status = status_from_response(code);
    log::debug!("location portal answered {code} ({status:?})");

    if status != AuthorizationStatus::NotDetermined {
        record_grant(status);
    }
    Ok(status)
}

/// Starts a portal location session and waits for the user's answer.
async fn ask_portal() -> zbus::Result<u32> {
    let connection = Connection::session().await?;
    let portal = Proxy::new(&connection, PORTAL_SERVICE, PORTAL_PATH, LOCATION_IFACE).await?;
    let token = format!("geokit{}", std::process::id());

    let mut session_options: HashMap<&str, Value<'_>> = HashMap::new();
    session_options.insert("session_handle_token", Value::from(token.as_str()));
    let session: OwnedObjectPath = portal.call("CreateSession", &(session_options,)).await?;

    let unique_name = connection
        .unique_name()
        .ok_or_else(|| zbus::Error::Failure("no unique bus name".to_string()))?
        .to_string();
    let path = request_path(&unique_name, &token);
    let request = Proxy::new(&connection, PORTAL_SERVICE, path.as_str(), REQUEST_IFACE).await?;

    // Subscribe before starting so a prompt-less answer is not missed.
    let responses = request.receive_signal("Response").await?;
    pin_mut!(responses);

    let mut start_options: HashMap<&str, Value<'_>> = HashMap::new();
    start_options.insert("handle_token", Value::from(token.as_str()));
    let _: OwnedObjectPath = portal
        .call("Start", &(&session, "", start_options))
        .await?;

    let code = match responses.next().await {
        Some(message) => {
            let (code, _results): (u32, HashMap<String, OwnedValue>) =
                message.body().deserialize()?;
            code
        }
        None => 2,
    };

    // Access outlives the session; only the answer is kept.
    let session = Proxy::new(&connection, PORTAL_SERVICE, session.as_str(), SESSION_IFACE).await?;
    session.call_method("Close", &()).await?;

    Ok(code)
}
