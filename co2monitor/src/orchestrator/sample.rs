//! The environment sample for the current selection.

use crate::api::DataFetchError;
use crate::model::{AirQuality, Co2Reading, LocationQuery, WeatherReport};

/// CO2 part of a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Co2State {
    Pending,
    Known(Co2Reading),
    Failed(DataFetchError),
}

/// Air-quality part of a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum AirQualityState {
    Pending,
    Known(AirQuality),
    /// No figure from either source. Shown as a neutral "no AQI" state.
    Unavailable,
}

/// Progress of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionStatus {
    /// Nothing has arrived yet.
    Loading,
    /// Some parts are in, others still pending.
    Partial,
    /// Everything resolved and CO2 is known.
    Complete,
    /// Everything resolved but CO2 failed.
    Failed,
}

impl SelectionStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, SelectionStatus::Complete | SelectionStatus::Failed)
    }
}

/// Data gathered for one selection. Replaced wholesale by the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentSample {
    pub query: LocationQuery,
    pub co2: Co2State,
    pub weather: Option<WeatherReport>,
    pub air_quality: AirQualityState,
}

impl EnvironmentSample {
    pub fn new(query: LocationQuery) -> Self {
        Self {
            query,
            co2: Co2State::Pending,
            weather: None,
            air_quality: AirQualityState::Pending,
        }
    }

    pub fn co2(&self) -> Option<&Co2Reading> {
        match &self.co2 {
            Co2State::Known(reading) => Some(reading),
            _ => None,
        }
    }

    pub fn co2_error(&self) -> Option<&DataFetchError> {
        match &self.co2 {
            Co2State::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn air_quality(&self) -> Option<&AirQuality> {
        match &self.air_quality {
            AirQualityState::Known(aq) => Some(aq),
            _ => None,
        }
    }

    pub fn status(&self) -> SelectionStatus {
        let co2_done = !matches!(self.co2, Co2State::Pending);
        let aq_done = !matches!(self.air_quality, AirQualityState::Pending);

        match (co2_done, aq_done) {
            (false, false) if self.weather.is_none() => SelectionStatus::Loading,
            (true, true) if self.co2().is_some() => SelectionStatus::Complete,
            (true, true) => SelectionStatus::Failed,
            _ => SelectionStatus::Partial,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status().is_settled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AirComponents, Coordinates};

    fn reading() -> Co2Reading {
        Co2Reading {
            avg_ppm: 950.0,
            min_ppm: 940.0,
            max_ppm: 960.0,
            distance_km: 3.0,
            source: Coordinates::new(-12.0, -75.0),
            buffer_radius_m: 10000.0,
            city: None,
        }
    }

    #[test]
    fn test_status_progression() {
        let mut sample = EnvironmentSample::new(LocationQuery::city("huancayo"));
        assert_eq!(sample.status(), SelectionStatus::Loading);

        sample.air_quality = AirQualityState::Known(AirQuality::from_index(2, AirComponents::new()));
        assert_eq!(sample.status(), SelectionStatus::Partial);

        sample.co2 = Co2State::Known(reading());
        assert_eq!(sample.status(), SelectionStatus::Complete);
        assert!(sample.is_settled());
    }

    #[test]
    fn test_failed_co2_settles_as_failed() {
        let mut sample = EnvironmentSample::new(LocationQuery::city("lima"));
        sample.co2 = Co2State::Failed(DataFetchError::Network("down".into()));
        assert_eq!(sample.status(), SelectionStatus::Partial);

        sample.air_quality = AirQualityState::Unavailable;
        assert_eq!(sample.status(), SelectionStatus::Failed);
    }
}
