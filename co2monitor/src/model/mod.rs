//! Domain types shared by the API client, the orchestrator and the renderers.
//!
//! These are the decoded, validated forms of what the backend returns. Wire
//! shapes live in [`crate::api`] and are converted into these types at the
//! edge, so nothing downstream handles optional JSON fields.

use std::collections::BTreeMap;
use std::fmt;

use crate::hazard::{classify_aqi, AqiLevel};

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether both components are inside the valid geographic range.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance to another point (haversine).
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let (lat1, lon1) = (self.lat.to_radians(), self.lon.to_radians());
        let (lat2, lon2) = (other.lat.to_radians(), other.lon.to_radians());
        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * a.sqrt().asin() * EARTH_RADIUS_KM
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}°, {:.4}°", self.lat, self.lon)
    }
}

/// What the user asked to see. Immutable once issued.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    /// A city known to the backend catalog, by name.
    City(String),
    /// Raw coordinates, e.g. from device location or a global search hit.
    ///
    /// The name is display-only; the marker is always drawn at `at`.
    Coordinates {
        at: Coordinates,
        name: Option<String>,
    },
}

impl LocationQuery {
    pub fn city(name: impl Into<String>) -> Self {
        LocationQuery::City(name.into())
    }

    pub fn coordinates(lat: f64, lon: f64) -> Self {
        LocationQuery::Coordinates {
            at: Coordinates::new(lat, lon),
            name: None,
        }
    }

    pub fn named_coordinates(lat: f64, lon: f64, name: impl Into<String>) -> Self {
        LocationQuery::Coordinates {
            at: Coordinates::new(lat, lon),
            name: Some(name.into()),
        }
    }

    /// Name for panels and logs.
    pub fn display_name(&self) -> String {
        match self {
            LocationQuery::City(name) => capitalize(name),
            LocationQuery::Coordinates { name: Some(name), .. } => name.clone(),
            LocationQuery::Coordinates { at, name: None } => at.to_string(),
        }
    }
}

/// Uppercase the first character of a name.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Aggregate CO2 statistic for a location.
#[derive(Debug, Clone, PartialEq)]
pub struct Co2Reading {
    pub avg_ppm: f64,
    pub min_ppm: f64,
    pub max_ppm: f64,
    /// Distance from the requested point to the dataset grid cell.
    pub distance_km: f64,
    /// Grid cell the values were taken from.
    pub source: Coordinates,
    /// Radius of the zone-of-relevance circle, in meters.
    pub buffer_radius_m: f64,
    /// Place name as reported by the backend.
    pub city: Option<String>,
}

/// Current weather for a location.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub temp_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub description: Option<String>,
}

/// Pollutant concentrations in μg/m³, keyed by the provider's names
/// (`pm2_5`, `pm10`, `o3`, `no2`, `so2`, `co`, ...).
pub type AirComponents = BTreeMap<String, f64>;

/// An air-quality reading with its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct AirQuality {
    pub aqi: i64,
    pub level: AqiLevel,
    pub label: String,
    pub color: String,
    pub components: AirComponents,
}

impl AirQuality {
    /// Build a reading from a raw index, classifying it locally.
    pub fn from_index(aqi: i64, components: AirComponents) -> Self {
        let hazard = classify_aqi(aqi);
        Self {
            aqi,
            level: hazard.level,
            label: hazard.label.to_string(),
            color: hazard.color.to_string(),
            components,
        }
    }
}

/// Combined result of the weather endpoint.
///
/// `air_quality` is `None` when the endpoint carried no usable index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherBundle {
    pub weather: Option<WeatherReport>,
    pub air_quality: Option<AirQuality>,
}

/// A city with resolved coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CityInfo {
    pub name: String,
    pub at: Coordinates,
}

/// A global place-search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceMatch {
    pub name: String,
    pub display_name: String,
    pub at: Coordinates,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_zero_for_same_point() {
        let p = Coordinates::new(-12.0667, -75.2);
        assert!(p.distance_km(&p).abs() < 1e-9);
    }

    #[test]
    fn test_distance_lima_to_huancayo() {
        let lima = Coordinates::new(-12.0464, -77.0428);
        let huancayo = Coordinates::new(-12.0667, -75.2);
        let d = lima.distance_km(&huancayo);
        assert!((195.0..205.0).contains(&d), "got {}", d);
    }

    #[test]
    fn test_coordinates_validity() {
        assert!(Coordinates::new(90.0, -180.0).is_valid());
        assert!(!Coordinates::new(90.1, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, 181.0).is_valid());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(LocationQuery::city("huancayo").display_name(), "Huancayo");
        assert_eq!(
            LocationQuery::named_coordinates(-12.0, -77.0, "Lima").display_name(),
            "Lima"
        );
        assert_eq!(
            LocationQuery::coordinates(-12.0, -77.0).display_name(),
            "-12.0000°, -77.0000°"
        );
    }

    #[test]
    fn test_air_quality_from_index_classifies() {
        let aq = AirQuality::from_index(4, AirComponents::new());
        assert_eq!(aq.level, AqiLevel::Unhealthy);
        assert_eq!(aq.color, "#FF0000");
    }
}
