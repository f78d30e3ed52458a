//! Platform-specific location backends.

use std::sync::Arc;

use crate::LocationBackend;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "windows")]
pub use windows::WindowsBackend;

#[cfg(target_os = "linux")]
pub use linux::GeoClueBackend;

mod sink;
mod unsupported;

pub use unsupported::UnsupportedBackend;

/// The backend for the platform this crate was compiled for.
#[must_use]
pub fn default_backend() -> Arc<dyn LocationBackend> {
    #[cfg(target_os = "linux")]
    {
        Arc::new(GeoClueBackend::new())
    }

    #[cfg(target_os = "windows")]
    {
        Arc::new(WindowsBackend::new())
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Arc::new(UnsupportedBackend::default())
    }
}
