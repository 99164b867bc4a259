//! Reverse geocoding: coordinates to a place name.
//!
//! Best-effort only. Every failure collapses to [`UNKNOWN_PLACE`] so the
//! location pipeline never blocks on it.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::api::{build_url, BoxFuture, HttpClient};
use crate::model::Coordinates;

/// Name used when a place cannot be resolved.
pub const UNKNOWN_PLACE: &str = "Ubicación desconocida";

/// Default Nominatim reverse endpoint.
pub const NOMINATIM_REVERSE_URL: &str = "https://nominatim.openstreetmap.org/reverse";

/// Zoom level requesting city-level granularity.
const CITY_ZOOM: u8 = 10;

/// Resolves coordinates to a human-readable place name.
pub trait ReverseGeocoder: Send + Sync {
    /// Never fails; unresolvable points yield [`UNKNOWN_PLACE`].
    fn resolve_name(&self, at: Coordinates) -> BoxFuture<'_, String>;
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<Address>,
}

impl Address {
    /// First non-empty of city, town, village, state, country.
    fn best_name(self) -> Option<String> {
        [self.city, self.town, self.village, self.state, self.country]
            .into_iter()
            .flatten()
            .map(|s| s.trim().to_string())
            .find(|s| !s.is_empty())
    }
}

/// Reverse geocoder backed by Nominatim.
///
/// The transport carries the identifying User-Agent Nominatim requires.
pub struct NominatimGeocoder<C> {
    http: C,
    url: String,
}

impl<C: HttpClient> NominatimGeocoder<C> {
    pub fn new(http: C) -> Self {
        Self {
            http,
            url: NOMINATIM_REVERSE_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    async fn lookup(&self, at: Coordinates) -> Option<String> {
        let url = build_url(
            &self.url,
            &[
                ("format", "json".to_string()),
                ("lat", at.lat.to_string()),
                ("lon", at.lon.to_string()),
                ("zoom", CITY_ZOOM.to_string()),
                ("addressdetails", "1".to_string()),
            ],
        )
        .ok()?;

        let response = match self.http.get(&url).await {
            Ok(r) if r.is_success() => r,
            Ok(r) => {
                warn!(status = r.status, "Reverse geocoding returned an error status");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Reverse geocoding request failed");
                return None;
            }
        };

        match serde_json::from_slice::<ReverseResponse>(&response.body) {
            Ok(parsed) => parsed.address.and_then(Address::best_name),
            Err(e) => {
                warn!(error = %e, "Reverse geocoding response unreadable");
                None
            }
        }
    }
}

impl<C: HttpClient> ReverseGeocoder for NominatimGeocoder<C> {
    fn resolve_name(&self, at: Coordinates) -> BoxFuture<'_, String> {
        Box::pin(async move {
            let name = self.lookup(at).await;
            debug!(lat = at.lat, lon = at.lon, name = ?name, "Reverse geocoded");
            name.unwrap_or_else(|| UNKNOWN_PLACE.to_string())
        })
    }
}

/// Geocoder that never resolves anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeocoder;

impl ReverseGeocoder for NoGeocoder {
    fn resolve_name(&self, _at: Coordinates) -> BoxFuture<'_, String> {
        Box::pin(async { UNKNOWN_PLACE.to_string() })
    }
}
