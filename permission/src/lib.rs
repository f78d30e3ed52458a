//! Location authorization handling.
//!
//! This crate reports how far the application is allowed to use the device
//! location service and asks the platform for more access when needed.

#![warn(missing_docs)]

/// Platform-specific implementations.
pub mod sys;

use serde::{Deserialize, Serialize};

/// The level of location access being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorizationLevel {
    /// Access at any time, including while the application runs in the background.
    Always,
    /// Access only while the application is in use.
    WhenInUse,
}

/// The location authorization status reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    NotDetermined,
    /// Access is restricted (e.g., parental controls or device policy).
    Restricted,
    /// The user explicitly denied access.
    Denied,
    /// Access granted at any time.
    AuthorizedAlways,
    /// Access granted while the application is in use.
    AuthorizedWhenInUse,
}

impl AuthorizationStatus {
    /// Returns `true` for either authorized status.
    #[must_use]
    pub const fn is_authorized(self) -> bool {
        matches!(self, Self::AuthorizedAlways | Self::AuthorizedWhenInUse)
    }

    /// Returns `true` only for [`AuthorizationStatus::AuthorizedAlways`].
    #[must_use]
    pub const fn is_always(self) -> bool {
        matches!(self, Self::AuthorizedAlways)
    }

    /// Returns `true` only for [`AuthorizationStatus::AuthorizedWhenInUse`].
    #[must_use]
    pub const fn is_when_in_use(self) -> bool {
        matches!(self, Self::AuthorizedWhenInUse)
    }
}

/// Errors that can occur when requesting authorization.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PermissionError {
    /// Location authorization is not supported on this platform.
    #[error("location authorization not supported on this platform")]
    NotSupported,
    /// An unknown error occurred.
    #[error("unknown error: {0}")]
    Unknown(String),
}

/// Current authorization status, without prompting the user.
#[must_use]
pub fn status() -> AuthorizationStatus {
    sys::status()
}

/// Request the given authorization level from the user.
///
/// If the user already answered, this returns the current status without
/// showing a prompt.
///
/// # Errors
/// Returns a [`PermissionError`] if the platform has no location authorization
/// or the underlying platform call fails.
pub async fn request(level: AuthorizationLevel) -> Result<AuthorizationStatus, PermissionError> {
    log::debug!("requesting {level:?} location authorization");
    sys::request(level).await
}
