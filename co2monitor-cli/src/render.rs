//! Text rendering of the map scene.

use std::fmt::Write as _;

use co2monitor::external::EXTERNAL_SITE_NAME;
use co2monitor::orchestrator::{
    AirQualityState, Co2State, EnvironmentSample, MapScene, Panel, SceneSink, SelectionStatus,
};

/// Prints a line whenever the selection progresses or the external
/// reading changes.
#[derive(Default)]
pub struct ProgressSink {
    last: Option<ProgressKey>,
    last_external: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct ProgressKey {
    epoch: u64,
    status: Option<SelectionStatus>,
    ppm: Option<String>,
    aqi: Option<i64>,
}

impl ProgressKey {
    fn of(scene: &MapScene) -> Self {
        let status = match &scene.panel {
            Panel::Selection { status, .. } => Some(*status),
            _ => None,
        };
        Self {
            epoch: scene.epoch.value(),
            status,
            ppm: scene.primary.as_ref().map(|m| m.ppm_text.clone()),
            aqi: scene
                .primary
                .as_ref()
                .and_then(|m| m.aqi.as_ref().map(|a| a.aqi))
                .or_else(|| scene.aqi_only.as_ref().map(|m| m.aqi.aqi)),
        }
    }
}

impl SceneSink for ProgressSink {
    fn render(&mut self, scene: &MapScene) {
        if let Some(external) = &scene.external {
            if self.last_external.as_deref() != Some(external.value.as_str()) {
                println!(
                    "[{}] {}: {} ppm",
                    external.updated_at.format("%H:%M:%S"),
                    EXTERNAL_SITE_NAME,
                    external.value
                );
                self.last_external = Some(external.value.clone());
            }
        }

        let key = ProgressKey::of(scene);
        if key.status.is_none() || self.last.as_ref() == Some(&key) {
            return;
        }

        let mut line = format!("  … {}", status_text(key.status));
        if let Some(ppm) = &key.ppm {
            let _ = write!(line, " | CO2 {} ppm", ppm);
        }
        if let Some(aqi) = key.aqi {
            let _ = write!(line, " | AQI {}", aqi);
        }
        println!("{}", line);
        self.last = Some(key);
    }
}

fn status_text(status: Option<SelectionStatus>) -> &'static str {
    match status {
        Some(SelectionStatus::Loading) => "cargando",
        Some(SelectionStatus::Partial) => "datos parciales",
        Some(SelectionStatus::Complete) => "completo",
        Some(SelectionStatus::Failed) => "sin datos de CO2",
        None => "",
    }
}

/// Full description of a settled scene.
pub fn describe(scene: &MapScene) -> String {
    let mut out = String::new();

    match &scene.panel {
        Panel::Welcome => out.push_str("Selecciona una ciudad para ver sus datos.\n"),
        Panel::Notice(notice) => {
            let _ = writeln!(out, "{}", notice);
        }
        Panel::Selection { name, sample, .. } => describe_sample(&mut out, name, sample, scene),
    }

    if let Some(alert) = &scene.alert {
        let _ = writeln!(out, "\n[{:?}] {}", alert.level, alert.message);
    }

    out
}

fn describe_sample(out: &mut String, name: &str, sample: &EnvironmentSample, scene: &MapScene) {
    let _ = writeln!(out, "{}", name);
    let _ = writeln!(out, "{}", "=".repeat(name.chars().count()));

    match (&sample.co2, &scene.primary) {
        (Co2State::Known(reading), Some(marker)) => {
            let _ = writeln!(
                out,
                "CO2:       {} ppm ({}) - {}",
                marker.ppm_text,
                marker.co2.severity.label(),
                marker.description
            );
            let _ = writeln!(
                out,
                "Rango:     {:.0} - {:.0} ppm",
                reading.min_ppm, reading.max_ppm
            );
            let _ = writeln!(
                out,
                "Fuente:    {} ({:.2} km)",
                reading.source, reading.distance_km
            );
            let _ = writeln!(
                out,
                "Marcador:  {} {} en {}, radio {:.0} m",
                marker.hazard_label, marker.hazard_color, marker.position, marker.radius_m
            );
        }
        (Co2State::Known(reading), None) => {
            let _ = writeln!(out, "CO2:       {:.0} ppm", reading.avg_ppm);
        }
        (Co2State::Failed(e), _) => {
            let _ = writeln!(out, "CO2:       {}", e.user_message());
        }
        (Co2State::Pending, _) => {
            let _ = writeln!(out, "CO2:       cargando...");
        }
    }

    if let Some(weather) = &sample.weather {
        let temp = weather
            .temp_c
            .map(|t| format!("{:.1} °C", t))
            .unwrap_or_else(|| "-".to_string());
        let humidity = weather
            .humidity_pct
            .map(|h| format!("{:.0}%", h))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "Clima:     {}, humedad {}, {}",
            temp,
            humidity,
            weather.description.as_deref().unwrap_or("-")
        );
    }

    match &sample.air_quality {
        AirQualityState::Known(aq) => {
            let _ = writeln!(out, "AQI:       {} - {} ({})", aq.aqi, aq.label, aq.color);
            if !aq.components.is_empty() {
                let parts: Vec<String> = aq
                    .components
                    .iter()
                    .map(|(k, v)| format!("{} {:.1}", k, v))
                    .collect();
                let _ = writeln!(out, "           {} μg/m³", parts.join(", "));
            }
        }
        AirQualityState::Unavailable => {
            let _ = writeln!(out, "AQI:       no disponible");
        }
        AirQualityState::Pending => {
            let _ = writeln!(out, "AQI:       cargando...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use co2monitor::location::LocationNotice;

    #[test]
    fn test_describe_welcome() {
        let scene = MapScene::default();
        assert!(describe(&scene).starts_with("Selecciona una ciudad"));
    }

    #[test]
    fn test_describe_notice() {
        let scene = MapScene {
            panel: Panel::Notice(LocationNotice::Denied),
            ..MapScene::default()
        };
        assert!(describe(&scene).contains("Permisos de ubicación denegados"));
    }
}
