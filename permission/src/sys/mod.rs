//! Platform-specific authorization implementations.

#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
mod linux;

// Re-export platform implementations
#[cfg(target_os = "windows")]
pub(crate) use windows::{request, status};

#[cfg(target_os = "linux")]
pub(crate) use linux::{request, status};

// Fallback for platforms without a backend
#[cfg(not(any(target_os = "windows", target_os = "linux")))]
pub(crate) const fn status() -> crate::AuthorizationStatus {
    crate::AuthorizationStatus::NotDetermined
}

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
#[allow(clippy::unused_async)]
pub(crate) async fn request(
    _level: crate::AuthorizationLevel,
) -> Result<crate::AuthorizationStatus, crate::PermissionError> {
    Err(crate::PermissionError::NotSupported)
}
