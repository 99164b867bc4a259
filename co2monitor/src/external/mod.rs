//! External single-value reading.
//!
//! A fixed sensor publishes one CO2 figure at a JSON endpoint. The poller
//! fetches it on a fixed interval and hands each reading to the dashboard
//! as the external marker. The marker is independent of the current
//! selection and survives every `select`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{DataFetchError, FetchResult, HttpClient};
use crate::model::Coordinates;
use crate::orchestrator::{DashboardHandle, ExternalMarker};

/// Default endpoint of the external reading.
pub const DEFAULT_EXTERNAL_URL: &str =
    "https://testluis-36e52-default-rtdb.firebaseio.com/DATA1/VALOR1.json";

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Where the sensor sits.
pub const DEFAULT_EXTERNAL_POSITION: Coordinates = Coordinates {
    lat: -12.0485033,
    lon: -75.2026392,
};

/// Popup title of the external marker.
pub const EXTERNAL_SITE_NAME: &str = "Universidad Continental";

/// Object keys searched for the value, in order.
const VALUE_KEYS: [&str; 4] = ["lectura", "valor", "value", "VALOR1"];

/// Pull the displayable value out of the endpoint's JSON.
///
/// Objects yield the first non-null of [`VALUE_KEYS`], falling back to the
/// object itself. `null` means there is no reading.
pub fn extract_value(json: &Value) -> Option<String> {
    let value = match json {
        Value::Object(map) => VALUE_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find(|v| !v.is_null())
            .unwrap_or(json),
        other => other,
    };

    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Fetches the external reading.
pub struct ExternalSource<C> {
    http: C,
    url: String,
}

impl<C: HttpClient> ExternalSource<C> {
    pub fn new(http: C, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current value, or `None` when the endpoint holds no reading.
    pub async fn fetch(&self) -> FetchResult<Option<String>> {
        let response = self.http.get(&self.url).await?;
        if !response.is_success() {
            return Err(DataFetchError::classify(
                format!("HTTP {} from external reading", response.status),
                None,
            ));
        }

        let json: Value = serde_json::from_slice(&response.body)
            .map_err(|e| DataFetchError::malformed("external reading", e))?;
        Ok(extract_value(&json))
    }
}

/// Poller settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollerSettings {
    pub interval: Duration,
    pub position: Coordinates,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            position: DEFAULT_EXTERNAL_POSITION,
        }
    }
}

/// A running poll loop. Dropping it without [`stop`](Self::stop) leaves
/// the loop running until its dashboard goes away.
pub struct ExternalPoller {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ExternalPoller {
    /// Spawn the poll loop. The first fetch happens immediately.
    pub fn start<C: HttpClient + 'static>(
        source: Arc<ExternalSource<C>>,
        settings: PollerSettings,
        dashboard: DashboardHandle,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        info!(
            url = source.url(),
            interval_secs = settings.interval.as_secs(),
            "External reading poller started"
        );

        let handle = tokio::spawn(async move {
            poll_loop(source, settings, dashboard, token).await;
        });

        Self { cancel, handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Cancel the timer and wait for the loop to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "External reading poller ended abnormally");
        }
        info!("External reading poller stopped");
    }
}

async fn poll_loop<C: HttpClient>(
    source: Arc<ExternalSource<C>>,
    settings: PollerSettings,
    dashboard: DashboardHandle,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = ticker.tick() => {
                let value = match source.fetch().await {
                    Ok(Some(value)) => value,
                    Ok(None) => {
                        debug!("External endpoint holds no reading");
                        continue;
                    }
                    Err(e) => {
                        warn!(kind = e.kind(), error = %e, "External reading fetch failed");
                        continue;
                    }
                };

                debug!(value = %value, "External reading updated");
                let marker = ExternalMarker::new(settings.position, value, chrono::Local::now());
                if dashboard.update_external(marker).await.is_err() {
                    debug!("Dashboard gone, external poller exiting");
                    break;
                }
            }
        }
    }
}
