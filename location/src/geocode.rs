use std::fmt;
use std::thread;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{Location, LocationError, LocationResult};

/// Human-readable description of a place (country, city, street, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Placemark {
    /// Name of the place, or the full formatted address.
    pub name: Option<String>,
    /// Street name.
    pub thoroughfare: Option<String>,
    /// House number.
    pub sub_thoroughfare: Option<String>,
    /// City or town.
    pub locality: Option<String>,
    /// Neighbourhood or district.
    pub sub_locality: Option<String>,
    /// State or province.
    pub administrative_area: Option<String>,
    /// Postal code.
    pub postal_code: Option<String>,
    /// Country name.
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2 country code, upper case.
    pub iso_country_code: Option<String>,
    /// Coordinates of the place.
    pub location: Option<Location>,
}

/// Called once with the outcome of a reverse-geocoding request.
pub type GeocodeCompletion = Box<dyn FnOnce(LocationResult<Vec<Placemark>>) + Send + 'static>;

/// Translates coordinates into placemarks.
pub trait Geocoder: Send + Sync + fmt::Debug {
    /// Starts reverse geocoding `location`. The completion may run on another thread.
    fn reverse_geocode(&self, location: &Location, completion: GeocodeCompletion);
}

/// Settings for [`NominatimGeocoder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NominatimConfig {
    /// Base URL of the Nominatim instance.
    pub endpoint: String,
    /// User agent sent with every request; the public instance requires one.
    pub user_agent: String,
    /// Preferred language for the results, as an `Accept-Language` value.
    pub language: Option<String>,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("geokit/", env!("CARGO_PKG_VERSION")).to_string(),
            language: None,
        }
    }
}

/// Reverse geocoder backed by an OpenStreetMap Nominatim server.
///
/// Used on platforms without a native geocoder. Each request runs on its own
/// thread; there is no cancellation.
#[derive(Debug, Clone, Default)]
pub struct NominatimGeocoder {
    config: NominatimConfig,
}

impl NominatimGeocoder {
    /// Creates a geocoder with the given settings.
    #[must_use]
    pub const fn new(config: NominatimConfig) -> Self {
        Self { config }
    }

    /// The settings in use.
    #[must_use]
    pub const fn config(&self) -> &NominatimConfig {
        &self.config
    }

    fn fetch(config: &NominatimConfig, location: &Location) -> LocationResult<Vec<Placemark>> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| LocationError::Geocoding(e.to_string()))?;

        let url = format!("{}/reverse", config.endpoint.trim_end_matches('/'));
        let mut request = client.get(&url).query(&[
            ("format", "jsonv2".to_string()),
            ("addressdetails", "1".to_string()),
            ("lat", location.latitude.to_string()),
            ("lon", location.longitude.to_string()),
        ]);
        if let Some(language) = &config.language {
            request = request.header(reqwest::header::ACCEPT_LANGUAGE, language.as_str());
        }

        let body = request
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::text)
            .map_err(|e| LocationError::Geocoding(e.to_string()))?;

        placemarks_from_response(&body, location)
    }
}

impl Geocoder for NominatimGeocoder {
    fn reverse_geocode(&self, location: &Location, completion: GeocodeCompletion) {
        let config = self.config.clone();
        let location = location.clone();
        debug!(
            "reverse geocoding {:.6}, {:.6} via {}",
            location.latitude, location.longitude, config.endpoint
        );
        thread::spawn(move || completion(Self::fetch(&config, &location)));
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    name: Option<String>,
    display_name: Option<String>,
    lat: Option<String>,
    lon: Option<String>,
    address: Option<Address>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    house_number: Option<String>,
    road: Option<String>,
    neighbourhood: Option<String>,
    suburb: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    hamlet: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
}

/// Parses a Nominatim `jsonv2` reverse response.
///
/// A response that only carries an `error` field (nothing at those
/// coordinates) yields no placemarks.
pub(crate) fn placemarks_from_response(
    body: &str,
    queried: &Location,
) -> LocationResult<Vec<Placemark>> {
    let response: ReverseResponse =
        serde_json::from_str(body).map_err(|e| LocationError::Geocoding(e.to_string()))?;

    if let Some(reason) = response.error {
        debug!("no placemark found: {reason}");
        return Ok(Vec::new());
    }

    let location = match (response.lat, response.lon) {
        (Some(lat), Some(lon)) => match (lat.parse(), lon.parse()) {
            (Ok(lat), Ok(lon)) => Location::new(lat, lon),
            _ => queried.clone(),
        },
        _ => queried.clone(),
    };

    let address = response.address.unwrap_or_default();
    let name = response
        .name
        .filter(|n| !n.is_empty())
        .or(response.display_name);

    Ok(vec![Placemark {
        name,
        thoroughfare: address.road,
        sub_thoroughfare: address.house_number,
        locality: address
            .city
            .or(address.town)
            .or(address.village)
            .or(address.hamlet),
        sub_locality: address.suburb.or(address.neighbourhood),
        administrative_area: address.state,
        postal_code: address.postcode,
        country: address.country,
        iso_country_code: address.country_code.map(|c| c.to_uppercase()),
        location: Some(location),
    }])
}
