//! The dashboard context: epoch, sample and scene for the current selection.
//!
//! [`Dashboard`] is synchronous and performs no I/O. `select` returns a
//! [`SelectionPlan`] describing the fetches to launch; their results come
//! back as [`Update`]s tagged with the launching epoch. Updates for any
//! other epoch are rejected, so a slow response for an earlier selection
//! can never touch the current one.
//!
//! The scene is recomputed from the sample after every applied update. The
//! marker therefore depends only on which parts are known, not on the order
//! they arrived in.

use tracing::{debug, info, warn};

use crate::api::DataFetchError;
use crate::catalog::{city_key, CityCatalog};
use crate::location::LocationNotice;
use crate::model::{AirQuality, CityInfo, Co2Reading, Coordinates, LocationQuery, WeatherBundle};

use super::epoch::Epoch;
use super::sample::{AirQualityState, Co2State, EnvironmentSample, SelectionStatus};
use super::scene::{
    Alert, AlertLevel, AqiMarker, ExternalMarker, MapScene, MapView, MarkerState, Panel,
    SELECTION_ZOOM,
};

/// CO2 fetch to launch for a selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Co2Request {
    City(String),
    Custom(Coordinates),
}

/// Fetches to launch for a new selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPlan {
    pub epoch: Epoch,
    pub co2: Co2Request,
    /// Weather can start immediately when coordinates are already known.
    pub weather_at: Option<Coordinates>,
    /// City whose coordinates must be looked up first.
    pub lookup_city: Option<String>,
}

/// Result of one fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateKind {
    CityResolved(Result<CityInfo, DataFetchError>),
    Co2(Result<Co2Reading, DataFetchError>),
    Weather(Result<WeatherBundle, DataFetchError>),
    FallbackAirQuality(Result<Option<AirQuality>, DataFetchError>),
}

impl UpdateKind {
    fn name(&self) -> &'static str {
        match self {
            UpdateKind::CityResolved(_) => "city",
            UpdateKind::Co2(_) => "co2",
            UpdateKind::Weather(_) => "weather",
            UpdateKind::FallbackAirQuality(_) => "air_quality_fallback",
        }
    }
}

/// A fetch result tagged with the epoch it was launched under.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub epoch: Epoch,
    pub kind: UpdateKind,
}

impl Update {
    pub fn new(epoch: Epoch, kind: UpdateKind) -> Self {
        Self { epoch, kind }
    }
}

/// Follow-up fetch requested by an applied update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Followup {
    Weather(Coordinates),
    FallbackAirQuality(Coordinates),
}

/// Outcome of [`Dashboard::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The update belonged to a superseded selection and was dropped.
    Stale,
    Applied(Option<Followup>),
}

impl Applied {
    pub fn is_stale(&self) -> bool {
        matches!(self, Applied::Stale)
    }
}

/// Selection state owner.
#[derive(Debug)]
pub struct Dashboard {
    epoch: Epoch,
    catalog: CityCatalog,
    sample: Option<EnvironmentSample>,
    /// Where the current selection's markers go, once known.
    target: Option<Coordinates>,
    scene: MapScene,
}

impl Dashboard {
    pub fn new(catalog: CityCatalog) -> Self {
        Self {
            epoch: Epoch::INITIAL,
            catalog,
            sample: None,
            target: None,
            scene: MapScene::default(),
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn catalog(&self) -> &CityCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut CityCatalog {
        &mut self.catalog
    }

    pub fn scene(&self) -> &MapScene {
        &self.scene
    }

    pub fn sample(&self) -> Option<&EnvironmentSample> {
        self.sample.as_ref()
    }

    pub fn status(&self) -> Option<SelectionStatus> {
        self.sample.as_ref().map(EnvironmentSample::status)
    }

    /// True when there is no selection or the current one has settled.
    pub fn is_settled(&self) -> bool {
        self.sample.as_ref().map_or(true, EnvironmentSample::is_settled)
    }

    /// Start a new selection.
    ///
    /// Invalidates the previous sample and clears its markers before
    /// returning; nothing from the previous epoch survives.
    pub fn select(&mut self, query: LocationQuery) -> SelectionPlan {
        self.epoch = self.epoch.next();
        let epoch = self.epoch;

        let (co2, target, lookup_city) = match &query {
            LocationQuery::City(name) => {
                let key = city_key(name);
                let target = self.catalog.coordinates(&key);
                let lookup = target.is_none().then(|| key.clone());
                (Co2Request::City(key), target, lookup)
            }
            LocationQuery::Coordinates { at, .. } => (Co2Request::Custom(*at), Some(*at), None),
        };

        info!(
            epoch = %epoch,
            query = %query.display_name(),
            centered = target.is_some(),
            "Selection launched"
        );

        self.target = target;
        self.sample = Some(EnvironmentSample::new(query));
        self.scene.epoch = epoch;
        self.scene.primary = None;
        self.scene.aqi_only = None;
        self.scene.alert = None;
        if let Some(center) = target {
            self.scene.view = MapView {
                center,
                zoom: SELECTION_ZOOM,
            };
        }
        self.refresh();

        SelectionPlan {
            epoch,
            co2,
            weather_at: target,
            lookup_city,
        }
    }

    /// Apply a fetch result.
    pub fn apply(&mut self, update: Update) -> Applied {
        if update.epoch != self.epoch || self.sample.is_none() {
            debug!(
                update_epoch = %update.epoch,
                current = %self.epoch,
                kind = update.kind.name(),
                "Stale result dropped"
            );
            return Applied::Stale;
        }

        let followup = match update.kind {
            UpdateKind::CityResolved(result) => self.city_resolved(result),
            UpdateKind::Co2(result) => {
                self.co2_resolved(result);
                None
            }
            UpdateKind::Weather(result) => self.weather_resolved(result),
            UpdateKind::FallbackAirQuality(result) => {
                self.fallback_resolved(result);
                None
            }
        };

        self.refresh();
        Applied::Applied(followup)
    }

    fn city_resolved(&mut self, result: Result<CityInfo, DataFetchError>) -> Option<Followup> {
        let sample = self.sample.as_mut()?;
        match result {
            Ok(info) => {
                debug!(city = %info.name, lat = info.at.lat, lon = info.at.lon, "City coordinates learned");
                self.catalog.learn(&info);
                self.target = Some(info.at);
                self.scene.view = MapView {
                    center: info.at,
                    zoom: SELECTION_ZOOM,
                };
                Some(Followup::Weather(info.at))
            }
            Err(e) => {
                warn!(error = %e, "City coordinate lookup failed");
                // Without coordinates there is nothing to ask for weather.
                sample.air_quality = AirQualityState::Unavailable;
                None
            }
        }
    }

    fn co2_resolved(&mut self, result: Result<Co2Reading, DataFetchError>) {
        let Some(sample) = self.sample.as_mut() else {
            return;
        };
        match result {
            Ok(reading) => {
                debug!(avg_ppm = reading.avg_ppm, "CO2 sample applied");
                sample.co2 = Co2State::Known(reading);
            }
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "CO2 fetch failed");
                self.scene.alert = Some(Alert::new(AlertLevel::Error, e.user_message()));
                sample.co2 = Co2State::Failed(e);
            }
        }
    }

    fn weather_resolved(&mut self, result: Result<WeatherBundle, DataFetchError>) -> Option<Followup> {
        let sample = self.sample.as_mut()?;
        let bundle = match result {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Weather fetch failed, trying air-pollution fallback");
                return self.fallback_for(self.target);
            }
        };

        sample.weather = bundle.weather;
        match bundle.air_quality {
            Some(aq) => {
                debug!(aqi = aq.aqi, "Air quality applied");
                sample.air_quality = AirQualityState::Known(aq);
                None
            }
            None => {
                debug!("Weather carried no AQI, trying air-pollution fallback");
                self.fallback_for(self.target)
            }
        }
    }

    fn fallback_for(&mut self, target: Option<Coordinates>) -> Option<Followup> {
        if target.is_none() {
            if let Some(sample) = self.sample.as_mut() {
                sample.air_quality = AirQualityState::Unavailable;
            }
        }
        target.map(Followup::FallbackAirQuality)
    }

    fn fallback_resolved(&mut self, result: Result<Option<AirQuality>, DataFetchError>) {
        let Some(sample) = self.sample.as_mut() else {
            return;
        };
        sample.air_quality = match result {
            Ok(Some(aq)) => {
                debug!(aqi = aq.aqi, "Fallback air quality applied");
                AirQualityState::Known(aq)
            }
            Ok(None) => AirQualityState::Unavailable,
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Air-pollution fallback failed");
                AirQualityState::Unavailable
            }
        };
    }

    /// Recompute the selection part of the scene from the sample.
    fn refresh(&mut self) {
        let Some(sample) = self.sample.as_ref() else {
            return;
        };

        let name = self.selection_name(sample);
        let position = self.target.or_else(|| sample.co2().map(|r| r.source));
        let status = sample.status();

        let (primary, aqi_only) = match (position, sample.co2(), sample.air_quality()) {
            (Some(at), Some(reading), aq) => (
                Some(MarkerState::derive(at, name.clone(), reading, aq)),
                None,
            ),
            (Some(at), None, Some(aq)) => (None, Some(AqiMarker::new(at, aq))),
            _ => (None, None),
        };

        self.scene.primary = primary;
        self.scene.aqi_only = aqi_only;
        self.scene.loading = !status.is_settled();
        self.scene.panel = Panel::Selection {
            name,
            status,
            sample: sample.clone(),
        };
    }

    fn selection_name(&self, sample: &EnvironmentSample) -> String {
        match &sample.query {
            LocationQuery::City(name) => self
                .catalog
                .get(name)
                .map(|e| e.name.clone())
                .unwrap_or_else(|| sample.query.display_name()),
            LocationQuery::Coordinates { .. } => sample.query.display_name(),
        }
    }

    /// Replace the external reading marker.
    pub fn set_external(&mut self, marker: ExternalMarker) {
        self.scene.external = Some(marker);
    }

    /// Place the user marker and center on it.
    pub fn set_user_location(&mut self, at: Coordinates) {
        self.scene.user_location = Some(at);
        self.scene.view = MapView {
            center: at,
            zoom: SELECTION_ZOOM,
        };
    }

    /// Show location guidance in the panel. Ignored while a selection is
    /// in progress; markers and the settled sample stay as they are.
    pub fn show_notice(&mut self, notice: LocationNotice) {
        if self.sample.as_ref().is_some_and(|s| !s.is_settled()) {
            return;
        }
        self.scene.panel = Panel::Notice(notice);
    }

    pub fn set_alert(&mut self, alert: Alert) {
        self.scene.alert = Some(alert);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::PositionError;
    use crate::model::{AirComponents, WeatherReport};

    fn reading(ppm: f64) -> Co2Reading {
        Co2Reading {
            avg_ppm: ppm,
            min_ppm: ppm - 5.0,
            max_ppm: ppm + 5.0,
            distance_km: 2.5,
            source: Coordinates::new(-12.0, -75.25),
            buffer_radius_m: 10000.0,
            city: Some("Huancayo".into()),
        }
    }

    fn weather(aqi: Option<i64>) -> WeatherBundle {
        WeatherBundle {
            weather: Some(WeatherReport {
                temp_c: Some(14.0),
                humidity_pct: Some(60.0),
                description: Some("nubes".into()),
            }),
            air_quality: aqi.map(|a| AirQuality::from_index(a, AirComponents::new())),
        }
    }

    fn dashboard() -> Dashboard {
        Dashboard::new(CityCatalog::builtin())
    }

    #[test]
    fn test_select_clears_and_centers_synchronously() {
        let mut dash = dashboard();
        let first = dash.select(LocationQuery::city("lima"));
        dash.apply(Update::new(first.epoch, UpdateKind::Co2(Ok(reading(420.0)))));
        assert!(dash.scene().primary.is_some());

        let plan = dash.select(LocationQuery::city("Huancayo"));
        assert_eq!(plan.co2, Co2Request::City("huancayo".into()));
        assert_eq!(plan.weather_at, Some(Coordinates::new(-12.0667, -75.2)));
        assert_eq!(plan.lookup_city, None);

        let scene = dash.scene();
        assert!(scene.primary.is_none());
        assert!(scene.aqi_only.is_none());
        assert!(scene.loading);
        assert_eq!(scene.view.center, Coordinates::new(-12.0667, -75.2));
        assert_eq!(scene.view.zoom, 10);
        assert_eq!(dash.status(), Some(SelectionStatus::Loading));
    }

    #[test]
    fn test_huancayo_950_then_aqi_4() {
        let mut dash = dashboard();
        let plan = dash.select(LocationQuery::city("huancayo"));

        dash.apply(Update::new(plan.epoch, UpdateKind::Co2(Ok(reading(950.0)))));
        let marker = dash.scene().primary.clone().unwrap();
        assert_eq!(marker.hazard_color, "#f1c40f");
        assert_eq!(marker.hazard_label, "Aceptable");
        assert_eq!(marker.ppm_text, "950");
        assert_eq!(marker.position, Coordinates::new(-12.0667, -75.2));

        dash.apply(Update::new(plan.epoch, UpdateKind::Weather(Ok(weather(Some(4))))));
        let scene = dash.scene();
        let marker = scene.primary.as_ref().unwrap();
        assert_eq!(marker.hazard_color, "#FF0000");
        assert_eq!(marker.ppm_text, "950");
        assert_eq!(scene.selection_marker_count(), 1);
        assert_eq!(dash.status(), Some(SelectionStatus::Complete));
        assert!(!scene.loading);
    }

    #[test]
    fn test_arrival_order_does_not_matter() {
        let mut co2_first = dashboard();
        let plan = co2_first.select(LocationQuery::city("cusco"));
        co2_first.apply(Update::new(plan.epoch, UpdateKind::Co2(Ok(reading(1300.0)))));
        co2_first.apply(Update::new(plan.epoch, UpdateKind::Weather(Ok(weather(Some(2))))));

        let mut aqi_first = dashboard();
        let plan = aqi_first.select(LocationQuery::city("cusco"));
        aqi_first.apply(Update::new(plan.epoch, UpdateKind::Weather(Ok(weather(Some(2))))));
        let partial = aqi_first.scene().clone();
        assert!(partial.primary.is_none());
        assert_eq!(partial.aqi_only.as_ref().map(|m| m.radius_m), Some(4000.0));
        aqi_first.apply(Update::new(plan.epoch, UpdateKind::Co2(Ok(reading(1300.0)))));

        assert_eq!(co2_first.scene().primary, aqi_first.scene().primary);
        assert!(aqi_first.scene().aqi_only.is_none());
        assert_eq!(aqi_first.scene().selection_marker_count(), 1);
    }

    #[test]
    fn test_late_result_of_previous_selection_is_dropped() {
        let mut dash = dashboard();
        let a = dash.select(LocationQuery::city("lima"));
        let b = dash.select(LocationQuery::city("arequipa"));

        dash.apply(Update::new(b.epoch, UpdateKind::Co2(Ok(reading(700.0)))));
        let before = dash.scene().clone();

        assert!(dash
            .apply(Update::new(a.epoch, UpdateKind::Co2(Ok(reading(1500.0)))))
            .is_stale());
        assert!(dash
            .apply(Update::new(a.epoch, UpdateKind::Weather(Ok(weather(Some(6))))))
            .is_stale());
        assert_eq!(dash.scene(), &before);
        assert_eq!(
            dash.scene().primary.as_ref().map(|m| m.position),
            Some(Coordinates::new(-16.4090, -71.5375))
        );
    }

    #[test]
    fn test_reselecting_same_city_is_idempotent() {
        let mut dash = dashboard();
        for _ in 0..3 {
            let plan = dash.select(LocationQuery::city("piura"));
            dash.apply(Update::new(plan.epoch, UpdateKind::Weather(Ok(weather(Some(3))))));
            dash.apply(Update::new(plan.epoch, UpdateKind::Co2(Ok(reading(500.0)))));
            assert_eq!(dash.scene().selection_marker_count(), 1);
        }
        assert_eq!(dash.epoch().value(), 3);
    }

    #[test]
    fn test_global_coordinates_place_marker_exactly() {
        let mut dash = dashboard();
        let at = Coordinates::new(-12.0621, -77.0365);
        let plan = dash.select(LocationQuery::named_coordinates(at.lat, at.lon, "Lima"));
        assert_eq!(plan.co2, Co2Request::Custom(at));
        assert_eq!(plan.weather_at, Some(at));

        dash.apply(Update::new(plan.epoch, UpdateKind::Co2(Ok(reading(415.0)))));
        let marker = dash.scene().primary.as_ref().unwrap();
        assert_eq!(marker.position, at);
        assert_eq!(marker.title, "Lima");
    }

    #[test]
    fn test_missing_aqi_requests_fallback() {
        let mut dash = dashboard();
        let plan = dash.select(LocationQuery::city("lima"));
        let lima = Coordinates::new(-12.0464, -77.0428);

        let applied = dash.apply(Update::new(plan.epoch, UpdateKind::Weather(Ok(weather(None)))));
        assert_eq!(applied, Applied::Applied(Some(Followup::FallbackAirQuality(lima))));

        let applied = dash.apply(Update::new(
            plan.epoch,
            UpdateKind::Weather(Err(DataFetchError::Network("down".into()))),
        ));
        assert_eq!(applied, Applied::Applied(Some(Followup::FallbackAirQuality(lima))));
    }

    #[test]
    fn test_no_fallback_key_is_neutral() {
        let mut dash = dashboard();
        let plan = dash.select(LocationQuery::city("lima"));
        dash.apply(Update::new(plan.epoch, UpdateKind::Co2(Ok(reading(420.0)))));
        dash.apply(Update::new(plan.epoch, UpdateKind::Weather(Ok(weather(None)))));
        dash.apply(Update::new(plan.epoch, UpdateKind::FallbackAirQuality(Ok(None))));

        let scene = dash.scene();
        assert_eq!(dash.status(), Some(SelectionStatus::Complete));
        assert!(scene.alert.is_none());
        let marker = scene.primary.as_ref().unwrap();
        assert_eq!(marker.hazard_color, "#2ecc71");
        assert!(marker.aqi.is_none());
    }

    #[test]
    fn test_co2_failure_alerts_and_keeps_center() {
        let mut dash = dashboard();
        let plan = dash.select(LocationQuery::city("trujillo"));
        dash.apply(Update::new(
            plan.epoch,
            UpdateKind::Co2(Err(DataFetchError::classify("Cuota quota excedida", None))),
        ));
        dash.apply(Update::new(plan.epoch, UpdateKind::Weather(Ok(weather(Some(1))))));

        let scene = dash.scene();
        assert!(scene.primary.is_none());
        assert_eq!(
            scene.alert,
            Some(Alert::new(AlertLevel::Error, "Cuota de descarga excedida"))
        );
        assert_eq!(scene.view.center, Coordinates::new(-8.1116, -79.0287));
        assert_eq!(dash.status(), Some(SelectionStatus::Failed));
    }

    #[test]
    fn test_unknown_city_waits_for_coordinates() {
        let mut dash = dashboard();
        let plan = dash.select(LocationQuery::city("Tacna"));
        assert_eq!(plan.lookup_city.as_deref(), Some("tacna"));
        assert_eq!(plan.weather_at, None);

        dash.apply(Update::new(plan.epoch, UpdateKind::Co2(Ok(reading(600.0)))));
        assert_eq!(
            dash.scene().primary.as_ref().map(|m| m.position),
            Some(Coordinates::new(-12.0, -75.25))
        );

        let tacna = Coordinates::new(-18.0146, -70.2536);
        let applied = dash.apply(Update::new(
            plan.epoch,
            UpdateKind::CityResolved(Ok(CityInfo {
                name: "Tacna".into(),
                at: tacna,
            })),
        ));
        assert_eq!(applied, Applied::Applied(Some(Followup::Weather(tacna))));
        assert_eq!(dash.scene().view.center, tacna);
        assert_eq!(dash.scene().primary.as_ref().map(|m| m.position), Some(tacna));
        assert_eq!(dash.catalog().coordinates("tacna"), Some(tacna));
    }

    #[test]
    fn test_external_marker_survives_selection() {
        let mut dash = dashboard();
        let marker = ExternalMarker::new(
            Coordinates::new(-12.0485033, -75.2026392),
            "417",
            chrono::Local::now(),
        );
        dash.set_external(marker.clone());
        dash.select(LocationQuery::city("lima"));
        dash.select(LocationQuery::city("iquitos"));
        assert_eq!(dash.scene().external, Some(marker));
    }

    #[test]
    fn test_notice_does_not_interrupt_selection() {
        let mut dash = dashboard();
        dash.show_notice(LocationNotice::Denied);
        assert_eq!(dash.scene().panel, Panel::Notice(LocationNotice::Denied));

        dash.select(LocationQuery::city("lima"));
        dash.show_notice(LocationNotice::Unsupported);
        assert!(matches!(dash.scene().panel, Panel::Selection { .. }));
    }

    #[test]
    fn test_notice_keeps_settled_marker() {
        let mut dash = dashboard();
        let plan = dash.select(LocationQuery::city("lima"));
        dash.apply(Update::new(plan.epoch, UpdateKind::Co2(Ok(reading(420.0)))));
        dash.apply(Update::new(plan.epoch, UpdateKind::Weather(Ok(weather(None)))));
        dash.apply(Update::new(plan.epoch, UpdateKind::FallbackAirQuality(Ok(None))));
        assert!(dash.is_settled());
        let marker = dash.scene().primary.clone().unwrap();

        dash.show_notice(LocationNotice::Retrying {
            failure: PositionError::Timeout,
            remaining: 2,
        });
        dash.show_notice(LocationNotice::Exhausted { constrained: false });

        let scene = dash.scene();
        assert_eq!(scene.primary.as_ref(), Some(&marker));
        assert!(!scene.loading);
        assert_eq!(
            scene.panel,
            Panel::Notice(LocationNotice::Exhausted { constrained: false })
        );
        assert!(dash.sample().and_then(|s| s.co2()).is_some());
    }
}
