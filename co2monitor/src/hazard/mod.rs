//! Hazard classification for CO2 and air-quality readings.
//!
//! Maps a measured quantity to a discrete severity with a display label and
//! color. Two independent scales exist:
//!
//! - [`classify_co2`]: three bands over the average ppm value
//! - [`classify_aqi`]: the fixed six-level ordinal air-quality index
//!
//! The marker presentation layer decides which scale drives the primary
//! marker (see [`crate::orchestrator::MarkerState`]).
//!
//! # Example
//!
//! ```
//! use co2monitor::hazard::{classify_aqi, classify_co2, Co2Severity};
//!
//! let co2 = classify_co2(950.0);
//! assert_eq!(co2.severity, Co2Severity::Acceptable);
//! assert_eq!(co2.label, "Aceptable");
//!
//! let aqi = classify_aqi(4);
//! assert_eq!(aqi.color, "#FF0000");
//! ```

mod color;

pub use color::contrasting_text_color;

// =============================================================================
// CO2 Bands
// =============================================================================

/// Upper bound (inclusive) of the "good" CO2 band in ppm.
pub const CO2_GOOD_MAX_PPM: f64 = 800.0;

/// Upper bound (inclusive) of the "acceptable" CO2 band in ppm.
pub const CO2_ACCEPTABLE_MAX_PPM: f64 = 1200.0;

/// Radius used for the secondary AQI-only circle, in meters.
pub const AQI_ONLY_RADIUS_METERS: f64 = 4000.0;

/// Base buffer radius used when the backend omits one, in meters.
const BASE_BUFFER_RADIUS_METERS: f64 = 5000.0;

/// Concentrations the backend uses for its own buffer radius steps.
const BACKEND_GOOD_MAX_PPM: f64 = 400.0;
const BACKEND_ACCEPTABLE_MAX_PPM: f64 = 450.0;

/// Severity band for an average CO2 concentration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Co2Severity {
    /// At or below 800 ppm.
    Good,
    /// Above 800 and at or below 1200 ppm.
    Acceptable,
    /// Above 1200 ppm.
    Dangerous,
}

impl Co2Severity {
    /// Label in the dashboard's locale.
    pub fn label(&self) -> &'static str {
        match self {
            Co2Severity::Good => "Bueno",
            Co2Severity::Acceptable => "Aceptable",
            Co2Severity::Dangerous => "Peligroso",
        }
    }

    /// English label.
    pub fn label_en(&self) -> &'static str {
        match self {
            Co2Severity::Good => "Good",
            Co2Severity::Acceptable => "Acceptable",
            Co2Severity::Dangerous => "Dangerous",
        }
    }

    /// Hex color for markers and circles.
    pub fn color(&self) -> &'static str {
        match self {
            Co2Severity::Good => "#2ecc71",
            Co2Severity::Acceptable => "#f1c40f",
            Co2Severity::Dangerous => "#e74c3c",
        }
    }

    /// One-line description shown in the marker popup.
    pub fn description(&self) -> &'static str {
        match self {
            Co2Severity::Good => "Nivel saludable de CO2",
            Co2Severity::Acceptable => "Concentración moderada de CO2",
            Co2Severity::Dangerous => "Concentración alta de CO2",
        }
    }
}

/// Result of classifying a CO2 reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Co2Hazard {
    pub severity: Co2Severity,
    pub label: &'static str,
    pub color: &'static str,
}

/// Classify an average CO2 concentration.
///
/// Boundary values belong to the lower band: 800 ppm is "good" and
/// 1200 ppm is "acceptable".
pub fn classify_co2(avg_ppm: f64) -> Co2Hazard {
    let severity = if avg_ppm <= CO2_GOOD_MAX_PPM {
        Co2Severity::Good
    } else if avg_ppm <= CO2_ACCEPTABLE_MAX_PPM {
        Co2Severity::Acceptable
    } else {
        Co2Severity::Dangerous
    };

    Co2Hazard {
        severity,
        label: severity.label(),
        color: severity.color(),
    }
}

/// Buffer radius the backend would have computed for a concentration.
///
/// Only used when a CO2 response arrives without `co2_status.buffer_radius`.
pub fn fallback_buffer_radius(avg_ppm: f64) -> f64 {
    if avg_ppm <= BACKEND_GOOD_MAX_PPM {
        BASE_BUFFER_RADIUS_METERS
    } else if avg_ppm <= BACKEND_ACCEPTABLE_MAX_PPM {
        BASE_BUFFER_RADIUS_METERS + 2000.0
    } else {
        BASE_BUFFER_RADIUS_METERS + 5000.0
    }
}

// =============================================================================
// Air Quality Index
// =============================================================================

/// Ordinal air-quality level, 1 (best) to 6 (worst).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AqiLevel {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
    /// Any index outside 1..=6.
    Unknown,
}

impl AqiLevel {
    /// Map a raw index to its level.
    pub fn from_index(aqi: i64) -> Self {
        match aqi {
            1 => AqiLevel::Good,
            2 => AqiLevel::Moderate,
            3 => AqiLevel::UnhealthySensitive,
            4 => AqiLevel::Unhealthy,
            5 => AqiLevel::VeryUnhealthy,
            6 => AqiLevel::Hazardous,
            _ => AqiLevel::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiLevel::Good => "Verde (Buena)",
            AqiLevel::Moderate => "Amarillo (Moderada)",
            AqiLevel::UnhealthySensitive => "Naranja (Insalubre para grupos sensibles)",
            AqiLevel::Unhealthy => "Rojo (Insalubre)",
            AqiLevel::VeryUnhealthy => "Morado (Muy insalubre)",
            AqiLevel::Hazardous => "Granate (Peligroso)",
            AqiLevel::Unknown => "Desconocido",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            AqiLevel::Good => "#00E400",
            AqiLevel::Moderate => "#FFFF00",
            AqiLevel::UnhealthySensitive => "#FF7E00",
            AqiLevel::Unhealthy => "#FF0000",
            AqiLevel::VeryUnhealthy => "#8F3F97",
            AqiLevel::Hazardous => "#7E0023",
            AqiLevel::Unknown => "#6B7280",
        }
    }
}

/// Result of classifying an air-quality index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AqiHazard {
    pub level: AqiLevel,
    pub label: &'static str,
    pub color: &'static str,
}

/// Classify a raw air-quality index.
///
/// Unrecognized values yield the neutral gray "Desconocido" level.
pub fn classify_aqi(aqi: i64) -> AqiHazard {
    let level = AqiLevel::from_index(aqi);
    AqiHazard {
        level,
        label: level.label(),
        color: level.color(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_co2_band_boundaries_belong_to_lower_band() {
        assert_eq!(classify_co2(800.0).severity, Co2Severity::Good);
        assert_eq!(classify_co2(800.0001).severity, Co2Severity::Acceptable);
        assert_eq!(classify_co2(1200.0).severity, Co2Severity::Acceptable);
        assert_eq!(classify_co2(1200.0001).severity, Co2Severity::Dangerous);
    }

    #[test]
    fn test_co2_labels_and_colors() {
        let good = classify_co2(410.0);
        assert_eq!(good.label, "Bueno");
        assert_eq!(good.color, "#2ecc71");
        assert_eq!(good.severity.label_en(), "Good");

        let acceptable = classify_co2(950.0);
        assert_eq!(acceptable.label, "Aceptable");
        assert_eq!(acceptable.color, "#f1c40f");

        let dangerous = classify_co2(2000.0);
        assert_eq!(dangerous.label, "Peligroso");
        assert_eq!(dangerous.color, "#e74c3c");
        assert_eq!(dangerous.severity.label_en(), "Dangerous");
    }

    #[test]
    fn test_aqi_fixed_colors() {
        let expected = [
            (1, "#00E400"),
            (2, "#FFFF00"),
            (3, "#FF7E00"),
            (4, "#FF0000"),
            (5, "#8F3F97"),
            (6, "#7E0023"),
        ];
        for (aqi, color) in expected {
            assert_eq!(classify_aqi(aqi).color, color, "aqi {}", aqi);
        }
    }

    #[test]
    fn test_aqi_unknown_is_gray() {
        for aqi in [0, 7, -1, 100] {
            let hazard = classify_aqi(aqi);
            assert_eq!(hazard.level, AqiLevel::Unknown);
            assert_eq!(hazard.label, "Desconocido");
            assert_eq!(hazard.color, "#6B7280");
        }
    }

    #[test]
    fn test_fallback_buffer_radius_steps() {
        assert_eq!(fallback_buffer_radius(400.0), 5000.0);
        assert_eq!(fallback_buffer_radius(420.0), 7000.0);
        assert_eq!(fallback_buffer_radius(451.0), 10000.0);
    }

    proptest! {
        #[test]
        fn prop_good_band(ppm in 0.0f64..=800.0) {
            let hazard = classify_co2(ppm);
            prop_assert_eq!(hazard.label, "Bueno");
            prop_assert_eq!(hazard.color, "#2ecc71");
        }

        #[test]
        fn prop_acceptable_band(ppm in 800.0001f64..=1200.0) {
            let hazard = classify_co2(ppm);
            prop_assert_eq!(hazard.label, "Aceptable");
            prop_assert_eq!(hazard.color, "#f1c40f");
        }

        #[test]
        fn prop_dangerous_band(ppm in 1200.0001f64..100_000.0) {
            let hazard = classify_co2(ppm);
            prop_assert_eq!(hazard.label, "Peligroso");
            prop_assert_eq!(hazard.color, "#e74c3c");
        }

        #[test]
        fn prop_out_of_range_aqi_is_unknown(aqi in any::<i64>().prop_filter("outside 1..=6", |v| !(1..=6).contains(v))) {
            prop_assert_eq!(classify_aqi(aqi).level, AqiLevel::Unknown);
        }
    }
}
