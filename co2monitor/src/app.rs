//! Application facade.
//!
//! [`App`] wires the actors together and exposes the dashboard's user
//! actions: pick a city, search, use my location, and the external reading.
//! Build one with [`AppBuilder`] inside a tokio runtime.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{AirPollutionClient, HttpClient, HttpError, MonitorApi, ReqwestClient};
use crate::catalog::{CityCatalog, DEFAULT_CITY};
use crate::config::ConfigFile;
use crate::external::{ExternalPoller, ExternalSource, PollerSettings};
use crate::geocode::{NominatimGeocoder, ReverseGeocoder};
use crate::location::{
    GeoOutcome, LocationDetector, LocationHandle, LocationNotice, PermissionProbe,
    PermissionState, Platform, PositionProvider, Scheduler, StaticPosition, TokioScheduler,
};
use crate::model::{Coordinates, LocationQuery};
use crate::orchestrator::search::{self, SearchError, Suggestion};
use crate::orchestrator::{
    Alert, AlertLevel, DashboardHandle, DashboardService, Epoch, MapScene, NullSink, Panel,
    SceneSink, SelectionStatus, ServiceStopped,
};

/// Transport shared by every client the app builds.
pub type SharedHttp = Arc<dyn HttpClient>;

/// Default number of global suggestions requested.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

// =============================================================================
// Errors
// =============================================================================

/// Errors surfaced by [`App`] actions.
#[derive(Debug)]
pub enum AppError {
    /// An HTTP client could not be built.
    Http(HttpError),
    /// A background actor is gone.
    Stopped,
    Search(SearchError),
    /// Location acquisition ended without a position.
    Location(GeoOutcome),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Http(e) => write!(f, "HTTP client setup failed: {}", e),
            AppError::Stopped => write!(f, "dashboard is no longer running"),
            AppError::Search(e) => write!(f, "{}", e),
            AppError::Location(outcome) => match outcome {
                GeoOutcome::Denied => write!(f, "Permisos de ubicación denegados"),
                GeoOutcome::Unavailable => write!(f, "Ubicación no disponible"),
                GeoOutcome::TimedOut => write!(f, "Tiempo de espera agotado"),
                GeoOutcome::Exhausted => write!(f, "No se pudo detectar tu ubicación"),
                GeoOutcome::Superseded => write!(f, "La detección fue reemplazada por otra"),
                GeoOutcome::Success(at) => write!(f, "Ubicación obtenida en {}", at),
            },
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Http(e) => Some(e),
            AppError::Search(e) => Some(e),
            AppError::Stopped | AppError::Location(_) => None,
        }
    }
}

impl From<ServiceStopped> for AppError {
    fn from(_: ServiceStopped) -> Self {
        AppError::Stopped
    }
}

impl From<HttpError> for AppError {
    fn from(e: HttpError) -> Self {
        AppError::Http(e)
    }
}

impl From<SearchError> for AppError {
    fn from(e: SearchError) -> Self {
        AppError::Search(e)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`App`]. Every seam defaults to its production implementation
/// configured from the [`ConfigFile`].
pub struct AppBuilder {
    config: ConfigFile,
    http: Option<SharedHttp>,
    geocoder: Option<Arc<dyn ReverseGeocoder>>,
    position: Option<Arc<dyn PositionProvider>>,
    probe: Option<Arc<dyn PermissionProbe>>,
    scheduler: Arc<dyn Scheduler>,
    platform: Platform,
    sink: Box<dyn SceneSink>,
    catalog: CityCatalog,
}

impl AppBuilder {
    pub fn new(config: ConfigFile) -> Self {
        Self {
            config,
            http: None,
            geocoder: None,
            position: None,
            probe: None,
            scheduler: Arc::new(TokioScheduler),
            platform: Platform::default(),
            sink: Box::new(NullSink),
            catalog: CityCatalog::builtin(),
        }
    }

    /// Transport for the backend, the air-pollution fallback and the
    /// external reading.
    pub fn with_http(mut self, http: SharedHttp) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn with_position(mut self, position: Arc<dyn PositionProvider>) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn PermissionProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn SceneSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_catalog(mut self, catalog: CityCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Spawn the actors. Must be called from within a tokio runtime.
    pub fn start(self) -> Result<App, AppError> {
        let config = self.config;

        let http: SharedHttp = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestClient::with_timeout(config.api.timeout_secs)?),
        };

        let geocoder: Arc<dyn ReverseGeocoder> = match self.geocoder {
            Some(geocoder) => geocoder,
            None => {
                let client =
                    ReqwestClient::with_options(config.api.timeout_secs, &config.geocoding.user_agent)?;
                Arc::new(NominatimGeocoder::new(client).with_url(config.geocoding.reverse_url.clone()))
            }
        };

        let device = Arc::new(
            StaticPosition::new(config.device.position()).with_permission(config.device.permission),
        );
        let position: Arc<dyn PositionProvider> = match self.position {
            Some(position) => position,
            None => device.clone(),
        };
        let probe: Arc<dyn PermissionProbe> = match self.probe {
            Some(probe) => probe,
            None => device,
        };

        let api = Arc::new(MonitorApi::new(Arc::clone(&http), config.api.base_url.clone()));
        let air = Arc::new(AirPollutionClient::new(
            Arc::clone(&http),
            config.openweathermap_key(),
        ));
        let external = Arc::new(ExternalSource::new(Arc::clone(&http), config.external.url.clone()));
        let poller_settings = PollerSettings {
            interval: Duration::from_secs(config.external.interval_secs),
            position: config.external.position(),
        };

        let shutdown = CancellationToken::new();
        let mut tasks = Vec::new();

        let cities: Vec<String> = self.catalog.keys().map(str::to_string).collect();
        let (service, dashboard) =
            DashboardService::new(self.catalog, Arc::clone(&api), air, self.sink);
        tasks.push(tokio::spawn(service.run(shutdown.clone())));

        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let (detector, location) = LocationDetector::new(position, self.scheduler, self.platform);
        let detector = detector
            .with_probe(Arc::clone(&probe))
            .with_notices(notice_tx);
        tasks.push(tokio::spawn(detector.run(shutdown.clone())));
        let (flush_tx, flush_rx) = mpsc::unbounded_channel();
        tasks.push(tokio::spawn(forward_notices(
            notice_rx,
            flush_rx,
            dashboard.clone(),
        )));

        info!(
            base_url = %config.api.base_url,
            air_pollution_key = config.openweathermap_key().is_some(),
            constrained = self.platform.constrained,
            "Application started"
        );

        Ok(App {
            dashboard,
            location,
            api,
            geocoder,
            probe,
            platform: self.platform,
            external,
            poller_settings,
            poller: None,
            notice_flush: flush_tx,
            cities,
            shutdown,
            tasks,
        })
    }
}

/// Relay detector notices to the panel, skipping `Located`.
///
/// A flush request is acknowledged only once every notice queued before it
/// has been posted to the dashboard.
async fn forward_notices(
    mut notices: mpsc::UnboundedReceiver<LocationNotice>,
    mut flushes: mpsc::UnboundedReceiver<oneshot::Sender<()>>,
    dashboard: DashboardHandle,
) {
    loop {
        tokio::select! {
            biased;

            notice = notices.recv() => {
                let Some(notice) = notice else { break };
                if matches!(notice, LocationNotice::Located(_)) {
                    continue;
                }
                debug!(notice = %notice, "Location notice");
                if dashboard.show_notice(notice).await.is_err() {
                    break;
                }
            }

            Some(ack) = flushes.recv() => {
                let _ = ack.send(());
            }
        }
    }
}

// =============================================================================
// App
// =============================================================================

/// The running dashboard application.
pub struct App {
    dashboard: DashboardHandle,
    location: LocationHandle,
    api: Arc<MonitorApi<SharedHttp>>,
    geocoder: Arc<dyn ReverseGeocoder>,
    probe: Arc<dyn PermissionProbe>,
    platform: Platform,
    external: Arc<ExternalSource<SharedHttp>>,
    poller_settings: PollerSettings,
    poller: Option<ExternalPoller>,
    notice_flush: mpsc::UnboundedSender<oneshot::Sender<()>>,
    /// Names offered for local matching.
    cities: Vec<String>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl App {
    pub fn dashboard(&self) -> &DashboardHandle {
        &self.dashboard
    }

    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    /// Refresh the city list from the backend, keeping the built-in names
    /// when it cannot be reached.
    pub async fn load_cities(&mut self) -> &[String] {
        match self.api.cities().await {
            Ok(cities) if !cities.is_empty() => {
                info!(count = cities.len(), "City list loaded");
                self.cities = cities;
            }
            Ok(_) => warn!("Backend returned no cities, keeping built-in list"),
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "City list unavailable, keeping built-in list")
            }
        }
        &self.cities
    }

    /// Start a selection without waiting for its data.
    pub async fn select(&self, query: LocationQuery) -> Result<Epoch, AppError> {
        Ok(self.dashboard.select(query).await?)
    }

    /// Select and wait until the selection settles.
    pub async fn show(&self, query: LocationQuery) -> Result<MapScene, AppError> {
        Ok(self.dashboard.show(query).await?)
    }

    pub async fn snapshot(&self) -> Result<MapScene, AppError> {
        Ok(self.dashboard.snapshot().await?)
    }

    /// "Perform search" on the search box text.
    pub async fn search(&self, text: &str) -> Result<MapScene, AppError> {
        match search::resolve(&self.api, &self.cities, text).await {
            Ok(query) => self.show(query).await,
            Err(e) => {
                warn!(query = text, error = %e, "Search failed");
                self.dashboard
                    .alert(Alert::new(AlertLevel::Warning, e.to_string()))
                    .await?;
                Err(e.into())
            }
        }
    }

    pub async fn suggest(&self, text: &str, limit: usize) -> Vec<Suggestion> {
        search::suggest(&self.api, &self.cities, text, limit).await
    }

    /// "Use my location": a manual detection with fresh counters.
    pub async fn locate(&self) -> Result<MapScene, AppError> {
        let outcome = self.location.reset_and_retry().await;
        self.located(outcome, true).await
    }

    /// Startup detection. `None` when nothing was attempted.
    pub async fn auto_detect(&self) -> Result<Option<MapScene>, AppError> {
        if self.platform.constrained {
            info!("Automatic location detection disabled on this platform");
            self.dashboard
                .show_notice(LocationNotice::AutoDetectDisabled)
                .await?;
            return Ok(None);
        }

        match self.probe.query().await {
            Some(PermissionState::Granted) => {
                let outcome = self.location.detect(false).await;
                self.located(outcome, false).await.map(Some)
            }
            Some(PermissionState::Denied) => {
                self.dashboard.show_notice(LocationNotice::Denied).await?;
                Ok(None)
            }
            permission => {
                debug!(permission = ?permission, "Automatic detection skipped");
                Ok(None)
            }
        }
    }

    /// Wait until every notice the detector has emitted is on the panel.
    async fn flush_notices(&self) -> Result<(), AppError> {
        let (ack, done) = oneshot::channel();
        self.notice_flush.send(ack).map_err(|_| AppError::Stopped)?;
        done.await.map_err(|_| AppError::Stopped)
    }

    /// Turn a detection outcome into a selection. Only manual detections
    /// raise alerts.
    async fn located(&self, outcome: GeoOutcome, manual: bool) -> Result<MapScene, AppError> {
        self.flush_notices().await?;

        let at: Coordinates = match outcome {
            GeoOutcome::Success(at) => at,
            GeoOutcome::Denied | GeoOutcome::Superseded => {
                return Err(AppError::Location(outcome));
            }
            other => {
                let err = AppError::Location(other);
                if manual {
                    self.dashboard
                        .alert(Alert::new(AlertLevel::Warning, err.to_string()))
                        .await?;
                }
                return Err(err);
            }
        };

        self.dashboard.set_user_location(at).await?;
        let name = self.geocoder.resolve_name(at).await;
        info!(lat = at.lat, lon = at.lon, name = %name, manual, "Device location resolved");
        // select clears the previous alert
        self.dashboard
            .select(LocationQuery::named_coordinates(at.lat, at.lon, name.clone()))
            .await?;
        if manual {
            self.dashboard
                .alert(Alert::new(
                    AlertLevel::Success,
                    format!("Ubicación detectada: {}", name),
                ))
                .await?;
        }

        let scene = self.dashboard.settled().await?;
        if !matches!(
            scene.panel,
            Panel::Selection {
                status: SelectionStatus::Failed,
                ..
            }
        ) {
            return Ok(scene);
        }

        warn!(city = DEFAULT_CITY, "No data for the detected position, showing default city");
        self.dashboard.select(LocationQuery::city(DEFAULT_CITY)).await?;
        if manual {
            self.dashboard
                .alert(Alert::new(
                    AlertLevel::Error,
                    "Error al obtener datos de tu ubicación",
                ))
                .await?;
        }
        Ok(self.dashboard.settled().await?)
    }

    /// Start polling the external reading. No-op when already running.
    pub fn start_external(&mut self) {
        if self.poller.as_ref().is_some_and(ExternalPoller::is_running) {
            return;
        }
        self.poller = Some(ExternalPoller::start(
            Arc::clone(&self.external),
            self.poller_settings,
            self.dashboard.clone(),
        ));
    }

    pub async fn stop_external(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop().await;
        }
    }

    /// Stop every actor and wait for them to exit.
    pub async fn shutdown(mut self) {
        self.stop_external().await;
        self.shutdown.cancel();
        drop(self.dashboard);
        drop(self.location);
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
        info!("Application stopped");
    }
}
