//! Manual test binary for geokit-location.
//!
//! Run with: cargo run -p geokit-location-demo

use std::time::Duration;

use anyhow::{Context, Result, bail};
use geokit_location::{Location, LocationEvent, LocationManager};

const FIX_TIMEOUT: Duration = Duration::from_secs(30);
const FIXES: usize = 3;

fn print_location(location: &Location) {
    println!("  Latitude:  {:.6}°", location.latitude);
    println!("  Longitude: {:.6}°", location.longitude);
    if let Some(alt) = location.altitude {
        println!("  Altitude:  {alt:.1}m");
    }
    if let Some(acc) = location.horizontal_accuracy {
        println!("  Accuracy:  {acc:.1}m");
    }
    println!("  Timestamp: {}", location.timestamp);
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    println!("=== Geokit Location Demo ===\n");

    let manager = LocationManager::shared();
    let events = manager.subscribe();

    println!("Location services enabled: {}", manager.location_services_enabled());
    println!("Authorization status: {:?}\n", manager.authorization_status());
    if !manager.location_services_enabled() {
        bail!("location services are not available on this machine");
    }

    if !manager.is_app_authorized() {
        println!("Requesting location authorization...");
        manager.request_when_in_use_authorization();
        println!("Authorization status: {:?}\n", geokit_permission::status());
    }

    println!("Tracking location ({FIXES} fixes)...");
    manager.start_tracking_location();

    let mut received = Vec::new();
    while received.len() < FIXES {
        let event = tokio::time::timeout(FIX_TIMEOUT, events.recv())
            .await
            .context("timed out waiting for a location fix")?
            .context("event stream closed")?;

        match event {
            LocationEvent::LocationUpdated(location) => {
                println!("✓ Fix #{}", received.len() + 1);
                print_location(&location);
                received.push(location);
            }
            LocationEvent::AuthorizationChanged(status) => {
                println!("Authorization changed: {status:?}");
            }
        }
    }
    manager.stop_tracking_location();

    let (first, last) = (&received[0], &received[received.len() - 1]);
    if let Some(meters) = manager.distance(Some(first), Some(last), true) {
        println!("\nMoved {meters:.1}m between the first and last fix");
    }

    println!("\nLooking up address...");
    let placemarks = manager.reverse_geocode(last).await;
    if placemarks.is_empty() {
        println!("✗ No address found");
    }
    for placemark in placemarks {
        println!(
            "✓ {}",
            placemark.name.as_deref().unwrap_or("(unnamed place)")
        );
        if let (Some(city), Some(country)) = (&placemark.locality, &placemark.country) {
            println!("  {city}, {country}");
        }
    }

    Ok(())
}
