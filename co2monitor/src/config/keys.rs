//! Addressable configuration keys (`section.key`).
//!
//! Every setting the file understands is listed here. Loading, saving and
//! the `config get/set/list` commands all go through [`ConfigKey`], so a key
//! cannot exist in one of them and be missing from another.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::location::PermissionState;

use super::file::ConfigFile;
use super::ConfigError;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    ApiBaseUrl,
    ApiTimeout,
    OpenWeatherMapApiKey,
    GeocodingReverseUrl,
    GeocodingUserAgent,
    ExternalUrl,
    ExternalInterval,
    ExternalLatitude,
    ExternalLongitude,
    DeviceLatitude,
    DeviceLongitude,
    DevicePermission,
    LoggingLevel,
    LoggingDirectory,
}

impl ConfigKey {
    /// All keys in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::ApiBaseUrl,
            ConfigKey::ApiTimeout,
            ConfigKey::OpenWeatherMapApiKey,
            ConfigKey::GeocodingReverseUrl,
            ConfigKey::GeocodingUserAgent,
            ConfigKey::ExternalUrl,
            ConfigKey::ExternalInterval,
            ConfigKey::ExternalLatitude,
            ConfigKey::ExternalLongitude,
            ConfigKey::DeviceLatitude,
            ConfigKey::DeviceLongitude,
            ConfigKey::DevicePermission,
            ConfigKey::LoggingLevel,
            ConfigKey::LoggingDirectory,
        ]
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::ApiBaseUrl | ConfigKey::ApiTimeout => "api",
            ConfigKey::OpenWeatherMapApiKey => "openweathermap",
            ConfigKey::GeocodingReverseUrl | ConfigKey::GeocodingUserAgent => "geocoding",
            ConfigKey::ExternalUrl
            | ConfigKey::ExternalInterval
            | ConfigKey::ExternalLatitude
            | ConfigKey::ExternalLongitude => "external",
            ConfigKey::DeviceLatitude | ConfigKey::DeviceLongitude | ConfigKey::DevicePermission => {
                "device"
            }
            ConfigKey::LoggingLevel | ConfigKey::LoggingDirectory => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::ApiBaseUrl => "base_url",
            ConfigKey::ApiTimeout => "timeout",
            ConfigKey::OpenWeatherMapApiKey => "api_key",
            ConfigKey::GeocodingReverseUrl => "reverse_url",
            ConfigKey::GeocodingUserAgent => "user_agent",
            ConfigKey::ExternalUrl => "url",
            ConfigKey::ExternalInterval => "interval",
            ConfigKey::ExternalLatitude | ConfigKey::DeviceLatitude => "latitude",
            ConfigKey::ExternalLongitude | ConfigKey::DeviceLongitude => "longitude",
            ConfigKey::DevicePermission => "permission",
            ConfigKey::LoggingLevel => "level",
            ConfigKey::LoggingDirectory => "directory",
        }
    }

    /// Current value as text; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        fn opt<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(ToString::to_string).unwrap_or_default()
        }

        match self {
            ConfigKey::ApiBaseUrl => config.api.base_url.clone(),
            ConfigKey::ApiTimeout => config.api.timeout_secs.to_string(),
            ConfigKey::OpenWeatherMapApiKey => opt(&config.openweathermap.api_key),
            ConfigKey::GeocodingReverseUrl => config.geocoding.reverse_url.clone(),
            ConfigKey::GeocodingUserAgent => config.geocoding.user_agent.clone(),
            ConfigKey::ExternalUrl => config.external.url.clone(),
            ConfigKey::ExternalInterval => config.external.interval_secs.to_string(),
            ConfigKey::ExternalLatitude => config.external.latitude.to_string(),
            ConfigKey::ExternalLongitude => config.external.longitude.to_string(),
            ConfigKey::DeviceLatitude => opt(&config.device.latitude),
            ConfigKey::DeviceLongitude => opt(&config.device.longitude),
            ConfigKey::DevicePermission => config
                .device
                .permission
                .map(|p| p.as_str().to_string())
                .unwrap_or_default(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingDirectory => config
                .logging
                .directory
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Validate and store `value`. An empty value clears optional keys.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            ConfigKey::ApiBaseUrl => config.api.base_url = self.url(value)?,
            ConfigKey::ApiTimeout => config.api.timeout_secs = self.positive(value)?,
            ConfigKey::OpenWeatherMapApiKey => {
                config.openweathermap.api_key = non_empty(value).map(str::to_string)
            }
            ConfigKey::GeocodingReverseUrl => config.geocoding.reverse_url = self.url(value)?,
            ConfigKey::GeocodingUserAgent => {
                config.geocoding.user_agent = self.required(value)?.to_string()
            }
            ConfigKey::ExternalUrl => config.external.url = self.url(value)?,
            ConfigKey::ExternalInterval => config.external.interval_secs = self.positive(value)?,
            ConfigKey::ExternalLatitude => config.external.latitude = self.degrees(value, 90.0)?,
            ConfigKey::ExternalLongitude => {
                config.external.longitude = self.degrees(value, 180.0)?
            }
            ConfigKey::DeviceLatitude => {
                config.device.latitude = match non_empty(value) {
                    Some(v) => Some(self.degrees(v, 90.0)?),
                    None => None,
                }
            }
            ConfigKey::DeviceLongitude => {
                config.device.longitude = match non_empty(value) {
                    Some(v) => Some(self.degrees(v, 180.0)?),
                    None => None,
                }
            }
            ConfigKey::DevicePermission => {
                config.device.permission = match non_empty(value) {
                    Some(v) => Some(
                        PermissionState::from_str(v).map_err(|reason| self.invalid(v, reason))?,
                    ),
                    None => None,
                }
            }
            ConfigKey::LoggingLevel => {
                let level = value.to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(self.invalid(value, "expected trace, debug, info, warn or error"));
                }
                config.logging.level = level;
            }
            ConfigKey::LoggingDirectory => {
                config.logging.directory = non_empty(value).map(PathBuf::from)
            }
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    fn required<'a>(&self, value: &'a str) -> Result<&'a str, ConfigError> {
        non_empty(value).ok_or_else(|| self.invalid(value, "value required"))
    }

    fn url(&self, value: &str) -> Result<String, ConfigError> {
        let value = self.required(value)?;
        reqwest::Url::parse(value).map_err(|e| self.invalid(value, e.to_string()))?;
        Ok(value.to_string())
    }

    fn positive(&self, value: &str) -> Result<u64, ConfigError> {
        match value.parse::<u64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(self.invalid(value, "expected a positive number of seconds")),
        }
    }

    fn degrees(&self, value: &str, limit: f64) -> Result<f64, ConfigError> {
        match value.parse::<f64>() {
            Ok(n) if (-limit..=limit).contains(&n) => Ok(n),
            _ => Err(self.invalid(value, format!("expected degrees within ±{}", limit))),
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}
