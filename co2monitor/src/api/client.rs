//! Typed client for the CO2 monitor backend.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::{DataFetchError, FetchResult};
use super::http::{build_url, HttpClient, HttpError};
use super::types::{
    decode_envelope, CitiesPayload, CityPayload, Co2Payload, SearchPayload, WeatherPayload,
};
use crate::model::{CityInfo, Co2Reading, Coordinates, PlaceMatch, WeatherBundle};

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// Bounds for the global search `limit` parameter.
pub const MIN_SEARCH_LIMIT: usize = 1;
pub const MAX_SEARCH_LIMIT: usize = 10;

/// Client for the backend's REST endpoints.
///
/// Generic over the transport so tests can inject a mock. Each method maps
/// one endpoint to a domain type; every failure is a classified
/// [`DataFetchError`].
pub struct MonitorApi<C> {
    http: C,
    base_url: String,
}

impl<C: HttpClient> MonitorApi<C> {
    /// Create a client for a base URL such as `http://localhost:5000/api`.
    pub fn new(http: C, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL from path segments, percent-encoding each.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, HttpError> {
        let mut url = reqwest::Url::parse(&format!("{}/", self.base_url))
            .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| HttpError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn endpoint_with(
        &self,
        segments: &[&str],
        params: &[(&str, String)],
    ) -> Result<String, HttpError> {
        let url = self.endpoint(segments)?;
        build_url(url.as_str(), params)
    }

    async fn fetch<T: DeserializeOwned>(&self, label: &str, url: String) -> FetchResult<T> {
        debug!(endpoint = label, url = %url, "Backend request");
        let response = self.http.get(&url).await.map_err(DataFetchError::from)?;
        let result = decode_envelope(label, &response);
        if let Err(ref e) = result {
            warn!(endpoint = label, status = response.status, kind = e.kind(), error = %e, "Backend request failed");
        }
        result
    }

    /// Names of the cities the backend knows about.
    pub async fn cities(&self) -> FetchResult<Vec<String>> {
        let url = self.endpoint_with(&["cities"], &[])?;
        let payload: CitiesPayload = self.fetch("/cities", url).await?;
        Ok(payload.cities)
    }

    /// Global place search. `limit` is clamped to 1..=10.
    pub async fn search_cities(&self, query: &str, limit: usize) -> FetchResult<Vec<PlaceMatch>> {
        let limit = limit.clamp(MIN_SEARCH_LIMIT, MAX_SEARCH_LIMIT);
        let url = self.endpoint_with(
            &["search", "cities"],
            &[("q", query.trim().to_string()), ("limit", limit.to_string())],
        )?;
        let payload: SearchPayload = self.fetch("/search/cities", url).await?;
        Ok(payload.into_matches())
    }

    /// Coordinates of a named city.
    pub async fn city_coordinates(&self, name: &str) -> FetchResult<CityInfo> {
        let url = self.endpoint_with(&["city", name, "coordinates"], &[])?;
        let payload: CityPayload = self.fetch("/city/{name}/coordinates", url).await?;
        Ok(payload.into_city())
    }

    /// CO2 sample for a named city.
    pub async fn co2_for_city(&self, name: &str) -> FetchResult<Co2Reading> {
        let url = self.endpoint_with(&["co2", name], &[])?;
        let payload: Co2Payload = self.fetch("/co2/{name}", url).await?;
        Ok(payload.into_reading())
    }

    /// CO2 sample for arbitrary coordinates.
    pub async fn co2_custom(&self, at: Coordinates) -> FetchResult<Co2Reading> {
        if !at.is_valid() {
            return Err(DataFetchError::Unclassified(format!(
                "Coordenadas fuera de rango: {}",
                at
            )));
        }
        let url = self.endpoint_with(
            &["co2", "custom"],
            &[("lat", at.lat.to_string()), ("lon", at.lon.to_string())],
        )?;
        let payload: Co2Payload = self.fetch("/co2/custom", url).await?;
        Ok(payload.into_reading())
    }

    /// Current weather and air quality for coordinates.
    pub async fn weather(&self, at: Coordinates) -> FetchResult<WeatherBundle> {
        let url = self.endpoint_with(
            &["weather"],
            &[("lat", at.lat.to_string()), ("lon", at.lon.to_string())],
        )?;
        let payload: WeatherPayload = self.fetch("/weather", url).await?;
        let (weather, air_quality) = payload.into_parts();
        Ok(WeatherBundle {
            weather,
            air_quality,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::http::tests::MockHttpClient;
    use crate::api::http::HttpResponse;
    use std::sync::Arc;

    const BASE: &str = "http://localhost:5000/api";

    fn api(mock: MockHttpClient) -> (Arc<MockHttpClient>, MonitorApi<Arc<MockHttpClient>>) {
        let mock = Arc::new(mock);
        (Arc::clone(&mock), MonitorApi::new(mock, format!("{}/", BASE)))
    }

    #[tokio::test]
    async fn test_cities() {
        let (_, api) = api(MockHttpClient::new().json(
            "http://localhost:5000/api/cities",
            r#"{"success": true, "cities": ["huancayo", "lima"]}"#,
        ));
        assert_eq!(api.cities().await.unwrap(), vec!["huancayo", "lima"]);
    }

    #[tokio::test]
    async fn test_search_clamps_limit() {
        let (mock, api) = api(MockHttpClient::new().json(
            "http://localhost:5000/api/search/cities",
            r#"{"success": true, "cities": []}"#,
        ));
        api.search_cities(" Lima ", 50).await.unwrap();
        api.search_cities("Lima", 0).await.unwrap();

        let requested = mock.requested();
        assert_eq!(
            requested[0],
            "http://localhost:5000/api/search/cities?q=Lima&limit=10"
        );
        assert!(requested[1].ends_with("limit=1"));
    }

    #[tokio::test]
    async fn test_city_name_is_path_encoded() {
        let (mock, api) = api(MockHttpClient::new());
        let _ = api.co2_for_city("san martín").await;
        assert_eq!(
            mock.requested(),
            vec!["http://localhost:5000/api/co2/san%20mart%C3%ADn"]
        );
    }

    #[tokio::test]
    async fn test_co2_custom_rejects_out_of_range() {
        let (mock, api) = api(MockHttpClient::new());
        let err = api
            .co2_custom(Coordinates::new(95.0, 0.0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unclassified");
        assert!(mock.requested().is_empty());
    }

    #[tokio::test]
    async fn test_co2_custom_query() {
        let (mock, api) = api(MockHttpClient::new().json(
            "http://localhost:5000/api/co2/custom",
            r#"{"success": true, "data": {
                "coordinates": {"target_lat": -12.06, "target_lon": -77.04, "actual_lat": -12.0, "actual_lon": -77.0},
                "co2_data": {"average_ppm": 415.2, "min_ppm": 410.0, "max_ppm": 420.0},
                "co2_status": {"buffer_radius": 7000}, "distance_km": 7.4}}"#,
        ));
        let reading = api
            .co2_custom(Coordinates::new(-12.06, -77.04))
            .await
            .unwrap();
        assert_eq!(reading.avg_ppm, 415.2);
        assert_eq!(
            mock.requested(),
            vec!["http://localhost:5000/api/co2/custom?lat=-12.06&lon=-77.04"]
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_network() {
        let (_, api) = api(MockHttpClient::new().route(
            "http://localhost:5000/api/weather",
            Err(HttpError::Connect("connection refused".into())),
        ));
        let err = api.weather(Coordinates::new(0.0, 0.0)).await.unwrap_err();
        assert_eq!(err.user_message(), "Error de conexión a internet");
    }

    #[tokio::test]
    async fn test_city_coordinates_not_found() {
        let (_, api) = api(MockHttpClient::new().route(
            "http://localhost:5000/api/city",
            Ok(HttpResponse::new(
                404,
                r#"{"success": false, "error": "Ciudad 'atlantis' no encontrada"}"#,
            )),
        ));
        let err = api.city_coordinates("atlantis").await.unwrap_err();
        assert_eq!(
            err,
            DataFetchError::Unclassified("Ciudad 'atlantis' no encontrada".into())
        );
    }
}
