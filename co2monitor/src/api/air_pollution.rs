//! Direct air-pollution lookup used when the backend has no AQI figure.

use serde::Deserialize;
use tracing::debug;

use super::error::{DataFetchError, FetchResult};
use super::http::{build_url, HttpClient};
use super::types::PollutionPayload;
use crate::model::{AirQuality, Coordinates};

/// Public air-pollution endpoint.
pub const AIR_POLLUTION_URL: &str = "https://api.openweathermap.org/data/2.5/air_pollution";

/// Error body returned by the provider on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: Option<String>,
}

/// Client for the air-pollution endpoint.
///
/// Without an API key no request is made and every lookup yields `None`.
pub struct AirPollutionClient<C> {
    http: C,
    url: String,
    api_key: Option<String>,
}

impl<C: HttpClient> AirPollutionClient<C> {
    pub fn new(http: C, api_key: Option<String>) -> Self {
        Self {
            http,
            url: AIR_POLLUTION_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Override the endpoint URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Current air quality at `at`, or `None` when no key or no data.
    pub async fn current(&self, at: Coordinates) -> FetchResult<Option<AirQuality>> {
        let Some(key) = self.api_key.as_deref() else {
            debug!("No air-pollution key configured, skipping fallback lookup");
            return Ok(None);
        };

        let url = build_url(
            &self.url,
            &[
                ("lat", at.lat.to_string()),
                ("lon", at.lon.to_string()),
                ("appid", key.to_string()),
            ],
        )?;
        let response = self.http.get(&url).await?;

        if !response.is_success() {
            let detail = serde_json::from_slice::<ProviderError>(&response.body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_default();
            return Err(DataFetchError::classify(
                format!("air pollution HTTP {}: {}", response.status, detail),
                None,
            ));
        }

        let payload: PollutionPayload = serde_json::from_slice(&response.body)
            .map_err(|e| DataFetchError::malformed("air_pollution", e))?;
        Ok(payload.into_air_quality())
    }
}
