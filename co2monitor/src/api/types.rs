//! Wire shapes for the backend and the air-pollution endpoint.
//!
//! Every endpoint wraps its payload in `{ "success": bool, ... }` and reports
//! failures as `{ "success": false, "error": ..., "error_kind"?: ... }`.
//! Decoding is two-phase: the status envelope first, then the typed payload.
//! Missing required fields reject the whole payload as unclassified instead
//! of producing a half-filled value.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::error::{DataFetchError, FetchResult};
use super::http::HttpResponse;
use crate::hazard::fallback_buffer_radius;
use crate::model::{
    AirComponents, AirQuality, CityInfo, Co2Reading, Coordinates, PlaceMatch, WeatherReport,
};

// =============================================================================
// Envelope
// =============================================================================

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    error_kind: Option<String>,
}

/// Render an `error` field that may be a string or an arbitrary JSON value.
fn error_text(error: Option<Value>) -> Option<String> {
    match error? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Decode a `{success, ...}` response into its payload type.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    endpoint: &str,
    response: &HttpResponse,
) -> FetchResult<T> {
    let status: StatusEnvelope = match serde_json::from_slice(&response.body) {
        Ok(status) => status,
        Err(e) if response.is_success() => return Err(DataFetchError::malformed(endpoint, e)),
        Err(_) => {
            return Err(DataFetchError::classify(
                format!("HTTP {} from {}", response.status, endpoint),
                None,
            ))
        }
    };

    if status.success != Some(true) {
        let message = error_text(status.error)
            .unwrap_or_else(|| format!("HTTP {} from {}", response.status, endpoint));
        return Err(DataFetchError::classify(message, status.error_kind.as_deref()));
    }

    serde_json::from_slice(&response.body).map_err(|e| DataFetchError::malformed(endpoint, e))
}

// =============================================================================
// Cities
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct CitiesPayload {
    pub cities: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceWire {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchPayload {
    cities: Vec<PlaceWire>,
}

impl SearchPayload {
    pub fn into_matches(self) -> Vec<PlaceMatch> {
        self.cities
            .into_iter()
            .map(|p| PlaceMatch {
                display_name: p.display_name.unwrap_or_else(|| p.name.clone()),
                name: p.name,
                at: Coordinates::new(p.lat, p.lon),
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct CityWire {
    name: String,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CityPayload {
    city: CityWire,
}

impl CityPayload {
    pub fn into_city(self) -> CityInfo {
        CityInfo {
            name: self.city.name,
            at: Coordinates::new(self.city.lat, self.city.lon),
        }
    }
}

// =============================================================================
// CO2
// =============================================================================

#[derive(Debug, Deserialize)]
struct Co2Stats {
    average_ppm: f64,
    min_ppm: f64,
    max_ppm: f64,
}

#[derive(Debug, Deserialize)]
struct Co2Status {
    #[serde(default)]
    buffer_radius: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Co2Coordinates {
    actual_lat: f64,
    actual_lon: f64,
    #[serde(default)]
    target_lat: Option<f64>,
    #[serde(default)]
    target_lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Co2Data {
    co2_data: Co2Stats,
    #[serde(default)]
    co2_status: Option<Co2Status>,
    coordinates: Co2Coordinates,
    #[serde(default)]
    distance_km: Option<f64>,
    #[serde(default)]
    city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Co2Payload {
    data: Co2Data,
}

impl Co2Payload {
    pub fn into_reading(self) -> Co2Reading {
        let data = self.data;
        let source = Coordinates::new(data.coordinates.actual_lat, data.coordinates.actual_lon);
        let distance_km = data.distance_km.unwrap_or_else(|| {
            match (data.coordinates.target_lat, data.coordinates.target_lon) {
                (Some(lat), Some(lon)) => Coordinates::new(lat, lon).distance_km(&source),
                _ => 0.0,
            }
        });
        let avg_ppm = data.co2_data.average_ppm;
        let buffer_radius_m = data
            .co2_status
            .and_then(|s| s.buffer_radius)
            .unwrap_or_else(|| fallback_buffer_radius(avg_ppm));

        Co2Reading {
            avg_ppm,
            min_ppm: data.co2_data.min_ppm,
            max_ppm: data.co2_data.max_ppm,
            distance_km,
            source,
            buffer_radius_m,
            city: data.city,
        }
    }
}

// =============================================================================
// Weather + air quality
// =============================================================================

#[derive(Debug, Deserialize)]
struct WeatherMain {
    #[serde(default)]
    temp: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WeatherCondition {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwmWeather {
    #[serde(default)]
    main: Option<WeatherMain>,
    #[serde(default)]
    weather: Vec<WeatherCondition>,
}

#[derive(Debug, Deserialize)]
struct AirQualityWire {
    #[serde(default)]
    aqi: Option<i64>,
    #[serde(default)]
    components: Option<BTreeMap<String, Option<f64>>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WeatherPayload {
    #[serde(default)]
    weather: Option<OwmWeather>,
    #[serde(default)]
    air_quality: Option<AirQualityWire>,
}

fn collect_components(raw: Option<BTreeMap<String, Option<f64>>>) -> AirComponents {
    raw.unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect()
}

impl WeatherPayload {
    /// Split into the weather part and the air-quality part.
    ///
    /// An absent or null `aqi` yields `None` for air quality, which callers
    /// treat as "no figure" and route to the fallback endpoint.
    pub fn into_parts(self) -> (Option<WeatherReport>, Option<AirQuality>) {
        let weather = self.weather.map(|w| WeatherReport {
            temp_c: w.main.as_ref().and_then(|m| m.temp),
            humidity_pct: w.main.as_ref().and_then(|m| m.humidity),
            description: w.weather.into_iter().find_map(|c| c.description),
        });

        let air_quality = self.air_quality.and_then(|aq| {
            aq.aqi
                .filter(|aqi| *aqi != 0)
                .map(|aqi| AirQuality::from_index(aqi, collect_components(aq.components)))
        });

        (weather, air_quality)
    }
}

#[derive(Debug, Deserialize)]
struct PollutionMain {
    #[serde(default)]
    aqi: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PollutionEntry {
    main: PollutionMain,
    #[serde(default)]
    components: Option<BTreeMap<String, Option<f64>>>,
}

/// Response of the public air-pollution endpoint (no envelope).
#[derive(Debug, Deserialize)]
pub(crate) struct PollutionPayload {
    #[serde(default)]
    list: Vec<PollutionEntry>,
}

impl PollutionPayload {
    pub fn into_air_quality(self) -> Option<AirQuality> {
        let entry = self.list.into_iter().next()?;
        let aqi = entry.main.aqi?;
        Some(AirQuality::from_index(aqi, collect_components(entry.components)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hazard::AqiLevel;

    const CO2_OK: &str = r##"{
        "success": true,
        "data": {
            "city": "Huancayo",
            "coordinates": {"target_lat": -12.0667, "target_lon": -75.2, "actual_lat": -12.0, "actual_lon": -75.0},
            "co2_data": {"values_ppm": [940, 960], "average_ppm": 950.0, "min_ppm": 940.0, "max_ppm": 960.0},
            "co2_status": {"color": "#fd7e14", "label": "Peligroso", "buffer_radius": 10000},
            "distance_km": 23.1
        }
    }"##;

    #[test]
    fn test_co2_payload_decodes() {
        let response = HttpResponse::ok(CO2_OK);
        let payload: Co2Payload = decode_envelope("/co2/huancayo", &response).unwrap();
        let reading = payload.into_reading();

        assert_eq!(reading.avg_ppm, 950.0);
        assert_eq!(reading.buffer_radius_m, 10000.0);
        assert_eq!(reading.distance_km, 23.1);
        assert_eq!(reading.source, Coordinates::new(-12.0, -75.0));
        assert_eq!(reading.city.as_deref(), Some("Huancayo"));
    }

    #[test]
    fn test_co2_missing_fields_fall_back() {
        let body = r#"{"success": true, "data": {
            "coordinates": {"target_lat": 0.0, "target_lon": 0.0, "actual_lat": 0.0, "actual_lon": 1.0},
            "co2_data": {"average_ppm": 420.0, "min_ppm": 410.0, "max_ppm": 430.0}
        }}"#;
        let payload: Co2Payload = decode_envelope("/co2/custom", &HttpResponse::ok(body)).unwrap();
        let reading = payload.into_reading();

        assert_eq!(reading.buffer_radius_m, 7000.0);
        assert!((reading.distance_km - 111.19).abs() < 0.1);
    }

    #[test]
    fn test_co2_missing_stats_is_malformed() {
        let body = r#"{"success": true, "data": {"coordinates": {"actual_lat": 0, "actual_lon": 0}}}"#;
        let err = decode_envelope::<Co2Payload>("/co2/x", &HttpResponse::ok(body)).unwrap_err();
        assert_eq!(err.kind(), "unclassified");
    }

    #[test]
    fn test_failure_envelope_is_classified() {
        let body = r#"{"success": false, "error": "Cuota excedida", "error_kind": "quota_error"}"#;
        let err =
            decode_envelope::<Co2Payload>("/co2/x", &HttpResponse::new(429, body)).unwrap_err();
        assert!(matches!(err, DataFetchError::QuotaExceeded(m) if m == "Cuota excedida"));
    }

    #[test]
    fn test_non_json_error_page() {
        let err = decode_envelope::<Co2Payload>("/co2/x", &HttpResponse::new(502, "<html>"))
            .unwrap_err();
        assert!(err.message().contains("HTTP 502"));
    }

    #[test]
    fn test_object_error_is_stringified() {
        let body = r#"{"success": false, "error": {"cod": 401, "message": "Invalid API key"}}"#;
        let err = decode_envelope::<WeatherPayload>("/weather", &HttpResponse::new(401, body))
            .unwrap_err();
        assert_eq!(err.kind(), "auth");
    }

    #[test]
    fn test_weather_payload_splits() {
        let body = r##"{
            "success": true,
            "weather": {"main": {"temp": 14.2, "humidity": 61}, "weather": [{"description": "nubes dispersas"}]},
            "forecast": {},
            "air_quality": {"aqi": 4, "label": "Rojo (Insalubre)", "color": "#FF0000",
                            "components": {"pm2_5": 35.5, "pm10": null, "o3": 60.1}}
        }"##;
        let payload: WeatherPayload = decode_envelope("/weather", &HttpResponse::ok(body)).unwrap();
        let (weather, aq) = payload.into_parts();

        let weather = weather.unwrap();
        assert_eq!(weather.temp_c, Some(14.2));
        assert_eq!(weather.humidity_pct, Some(61.0));
        assert_eq!(weather.description.as_deref(), Some("nubes dispersas"));

        let aq = aq.unwrap();
        assert_eq!(aq.level, AqiLevel::Unhealthy);
        assert_eq!(aq.components.get("pm2_5"), Some(&35.5));
        assert!(!aq.components.contains_key("pm10"));
    }

    #[test]
    fn test_weather_null_aqi_means_no_figure() {
        let body = r##"{"success": true, "weather": {"main": {"temp": 10}},
                       "air_quality": {"aqi": null, "label": "Desconocido", "color": "#6B7280", "components": {}}}"##;
        let payload: WeatherPayload = decode_envelope("/weather", &HttpResponse::ok(body)).unwrap();
        let (weather, aq) = payload.into_parts();
        assert!(weather.is_some());
        assert!(aq.is_none());
    }

    #[test]
    fn test_pollution_payload() {
        let body = r#"{"coord": {"lon": -77.0, "lat": -12.0},
                       "list": [{"main": {"aqi": 2}, "components": {"co": 201.94, "no2": 0.77}, "dt": 1}]}"#;
        let payload: PollutionPayload = serde_json::from_str(body).unwrap();
        let aq = payload.into_air_quality().unwrap();
        assert_eq!(aq.aqi, 2);
        assert_eq!(aq.color, "#FFFF00");
        assert_eq!(aq.components.len(), 2);
    }

    #[test]
    fn test_pollution_empty_list() {
        let payload: PollutionPayload = serde_json::from_str(r#"{"list": []}"#).unwrap();
        assert!(payload.into_air_quality().is_none());
    }

    #[test]
    fn test_search_payload_defaults_display_name() {
        let body = r#"{"success": true, "query": "Lima", "cities": [
            {"name": "Lima", "lat": -12.0621, "lon": -77.0365, "country": "Perú"}
        ]}"#;
        let payload: SearchPayload = decode_envelope("/search/cities", &HttpResponse::ok(body)).unwrap();
        let matches = payload.into_matches();
        assert_eq!(matches[0].display_name, "Lima");
        assert_eq!(matches[0].at, Coordinates::new(-12.0621, -77.0365));
    }
}
