//! Map scene: everything a renderer needs to draw the dashboard.
//!
//! The scene is derived from the current [`EnvironmentSample`] and never
//! edited piecemeal. A renderer receives a full snapshot through
//! [`SceneSink`] after every applied change.

use crate::hazard::{
    classify_co2, contrasting_text_color, Co2Hazard, AQI_ONLY_RADIUS_METERS,
};
use crate::location::LocationNotice;
use crate::model::{AirQuality, Co2Reading, Coordinates};

use super::epoch::Epoch;
use super::sample::{EnvironmentSample, SelectionStatus};

/// Zoom used when centering on a selection.
pub const SELECTION_ZOOM: u8 = 10;

/// Initial view: central Peru.
pub const INITIAL_VIEW: MapView = MapView {
    center: Coordinates {
        lat: -12.0667,
        lon: -75.2,
    },
    zoom: 6,
};

/// Marker color of the external reading.
pub const EXTERNAL_MARKER_COLOR: &str = "#4e73df";

/// Map viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: Coordinates,
    pub zoom: u8,
}

/// AQI figure shown alongside CO2.
#[derive(Debug, Clone, PartialEq)]
pub struct AqiSummary {
    pub aqi: i64,
    pub label: String,
    pub color: String,
}

impl From<&AirQuality> for AqiSummary {
    fn from(aq: &AirQuality) -> Self {
        Self {
            aqi: aq.aqi,
            label: aq.label.clone(),
            color: aq.color.clone(),
        }
    }
}

/// The primary marker and its buffer circle, drawn as one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerState {
    pub position: Coordinates,
    /// Fill of both marker and circle.
    pub hazard_color: String,
    pub hazard_label: String,
    /// Circle radius; always the CO2 buffer radius.
    pub radius_m: f64,
    /// Readable text color over `hazard_color`.
    pub text_color: &'static str,
    /// Average ppm rounded to an integer.
    pub ppm_text: String,
    /// CO2 classification, shown in the popup even when AQI drives color.
    pub co2: Co2Hazard,
    pub description: &'static str,
    pub aqi: Option<AqiSummary>,
    pub title: String,
    pub reading: Co2Reading,
}

impl MarkerState {
    /// Derive the pair for a reading. AQI, when present, drives color and
    /// label.
    pub fn derive(
        position: Coordinates,
        title: impl Into<String>,
        reading: &Co2Reading,
        air_quality: Option<&AirQuality>,
    ) -> Self {
        let co2 = classify_co2(reading.avg_ppm);
        let (hazard_color, hazard_label) = match air_quality {
            Some(aq) => (aq.color.clone(), aq.label.clone()),
            None => (co2.color.to_string(), co2.label.to_string()),
        };

        Self {
            position,
            text_color: contrasting_text_color(&hazard_color),
            hazard_color,
            hazard_label,
            radius_m: reading.buffer_radius_m,
            ppm_text: format!("{:.0}", reading.avg_ppm),
            co2,
            description: co2.severity.description(),
            aqi: air_quality.map(AqiSummary::from),
            title: title.into(),
            reading: reading.clone(),
        }
    }
}

/// Secondary marker shown while only air quality is known.
#[derive(Debug, Clone, PartialEq)]
pub struct AqiMarker {
    pub position: Coordinates,
    pub aqi: AqiSummary,
    pub radius_m: f64,
    pub text_color: &'static str,
}

impl AqiMarker {
    pub fn new(position: Coordinates, aq: &AirQuality) -> Self {
        Self {
            position,
            text_color: contrasting_text_color(&aq.color),
            aqi: AqiSummary::from(aq),
            radius_m: AQI_ONLY_RADIUS_METERS,
        }
    }
}

/// Marker for the fixed external reading.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalMarker {
    pub position: Coordinates,
    pub value: String,
    pub color: &'static str,
    pub text_color: &'static str,
    pub updated_at: chrono::DateTime<chrono::Local>,
}

impl ExternalMarker {
    pub fn new(
        position: Coordinates,
        value: impl Into<String>,
        updated_at: chrono::DateTime<chrono::Local>,
    ) -> Self {
        Self {
            position,
            value: value.into(),
            color: EXTERNAL_MARKER_COLOR,
            text_color: contrasting_text_color(EXTERNAL_MARKER_COLOR),
            updated_at,
        }
    }
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

impl Alert {
    pub fn new(level: AlertLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Side panel content.
#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
    Welcome,
    /// Location acquisition guidance.
    Notice(LocationNotice),
    Selection {
        name: String,
        status: SelectionStatus,
        sample: EnvironmentSample,
    },
}

/// Complete render state of the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct MapScene {
    /// Selection the scene belongs to.
    pub epoch: Epoch,
    pub view: MapView,
    pub primary: Option<MarkerState>,
    pub aqi_only: Option<AqiMarker>,
    /// Owned by the external poller, never touched by selection.
    pub external: Option<ExternalMarker>,
    pub user_location: Option<Coordinates>,
    pub panel: Panel,
    pub loading: bool,
    pub alert: Option<Alert>,
}

impl Default for MapScene {
    fn default() -> Self {
        Self {
            epoch: Epoch::INITIAL,
            view: INITIAL_VIEW,
            primary: None,
            aqi_only: None,
            external: None,
            user_location: None,
            panel: Panel::Welcome,
            loading: false,
            alert: None,
        }
    }
}

impl MapScene {
    /// Number of selection artifacts on the map.
    pub fn selection_marker_count(&self) -> usize {
        usize::from(self.primary.is_some()) + usize::from(self.aqi_only.is_some())
    }
}

/// Receives a scene snapshot after every applied change.
pub trait SceneSink: Send {
    fn render(&mut self, scene: &MapScene);
}

/// Sink that draws nothing.
#[derive(Debug, Default)]
pub struct NullSink;

impl SceneSink for NullSink {
    fn render(&mut self, _scene: &MapScene) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hazard::Co2Severity;
    use crate::model::AirComponents;

    fn reading(ppm: f64) -> Co2Reading {
        Co2Reading {
            avg_ppm: ppm,
            min_ppm: ppm - 10.0,
            max_ppm: ppm + 10.0,
            distance_km: 1.2,
            source: Coordinates::new(-12.0, -75.0),
            buffer_radius_m: 10000.0,
            city: Some("Huancayo".into()),
        }
    }

    #[test]
    fn test_co2_drives_marker_without_aqi() {
        let marker = MarkerState::derive(Coordinates::new(-12.0667, -75.2), "Huancayo", &reading(950.0), None);
        assert_eq!(marker.hazard_color, "#f1c40f");
        assert_eq!(marker.hazard_label, "Aceptable");
        assert_eq!(marker.ppm_text, "950");
        assert_eq!(marker.radius_m, 10000.0);
        assert_eq!(marker.description, "Concentración moderada de CO2");
        assert!(marker.aqi.is_none());
    }

    #[test]
    fn test_aqi_drives_color_but_not_radius() {
        let aq = AirQuality::from_index(4, AirComponents::new());
        let marker = MarkerState::derive(
            Coordinates::new(-12.0667, -75.2),
            "Huancayo",
            &reading(950.0),
            Some(&aq),
        );
        assert_eq!(marker.hazard_color, "#FF0000");
        assert_eq!(marker.hazard_label, "Rojo (Insalubre)");
        assert_eq!(marker.radius_m, 10000.0);
        assert_eq!(marker.ppm_text, "950");
        assert_eq!(marker.co2.severity, Co2Severity::Acceptable);
        assert_eq!(marker.aqi.as_ref().map(|a| a.aqi), Some(4));
    }

    #[test]
    fn test_aqi_only_marker_radius() {
        let aq = AirQuality::from_index(2, AirComponents::new());
        let marker = AqiMarker::new(Coordinates::new(0.0, 0.0), &aq);
        assert_eq!(marker.radius_m, 4000.0);
        assert_eq!(marker.text_color, "#0F172A");
    }
}
