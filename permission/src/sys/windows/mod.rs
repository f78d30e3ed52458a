//! Windows authorization implementation using WinRT.

use crate::{AuthorizationLevel, AuthorizationStatus, PermissionError};
use windows::Devices::Geolocation::{GeolocationAccessStatus, Geolocator};

fn access_status() -> Result<AuthorizationStatus, PermissionError> {
    let access = Geolocator::RequestAccessAsync()
        .map_err(|e| PermissionError::Unknown(e.message().to_string()))?
        .get()
        .map_err(|e| PermissionError::Unknown(e.message().to_string()))?;

    Ok(match access {
        // Desktop applications keep access while in the background once allowed.
        GeolocationAccessStatus::Allowed => AuthorizationStatus::AuthorizedAlways,
        GeolocationAccessStatus::Denied => AuthorizationStatus::Denied,
        _ => AuthorizationStatus::NotDetermined,
    })
}

pub(crate) fn status() -> AuthorizationStatus {
    access_status().unwrap_or(AuthorizationStatus::NotDetermined)
}

#[allow(clippy::unused_async)]
pub(crate) async fn request(
    _level: AuthorizationLevel,
) -> Result<AuthorizationStatus, PermissionError> {
    // RequestAccessAsync both checks and prompts if needed
    access_status()
}
