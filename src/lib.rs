//! # Geokit
//!
//! A small, cross-platform kit for working with the device location service.
//!
//! Geokit wraps the platform location service behind a single facade: authorization
//! checks, start/stop tracking, last-known location, distance between points and
//! reverse geocoding, with updates delivered through typed event subscriptions.
//!
//! ## Features
//!
//! - `permission`: Location authorization status and requests.
//! - `location`: The location facade, platform backends and reverse geocoding.
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! geokit = { version = "0.1", features = ["location"] }
//! ```
//!
//! ```ignore
//! use geokit::location::{LocationEvent, LocationManager};
//!
//! async fn follow() {
//!     let manager = LocationManager::shared();
//!     let events = manager.subscribe();
//!     manager.start_tracking_location();
//!
//!     while let Ok(event) = events.recv().await {
//!         if let LocationEvent::LocationUpdated(pos) = event {
//!             println!("Latitude: {}, Longitude: {}", pos.latitude, pos.longitude);
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "location")]
pub use geokit_location as location;

#[cfg(feature = "permission")]
pub use geokit_permission as permission;
