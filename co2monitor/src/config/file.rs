//! The INI configuration file.
//!
//! Lives at `~/.co2monitor/config.ini`. A missing file yields defaults; a
//! present one only needs the keys it wants to override.

use std::path::{Path, PathBuf};

use ini::Ini;

use crate::api::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, USER_AGENT};
use crate::external::{DEFAULT_EXTERNAL_POSITION, DEFAULT_EXTERNAL_URL, DEFAULT_POLL_INTERVAL};
use crate::geocode::NOMINATIM_REVERSE_URL;
use crate::location::PermissionState;
use crate::model::Coordinates;

use super::keys::ConfigKey;
use super::ConfigError;

/// Directory name under the home directory.
pub const CONFIG_DIR_NAME: &str = ".co2monitor";

/// File name inside [`config_dir`].
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Environment variable that overrides `openweathermap.api_key`.
pub const OPENWEATHERMAP_KEY_ENV: &str = "OPENWEATHERMAP_API_KEY";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// `~/.co2monitor`, or `./.co2monitor` when there is no home directory.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

// =============================================================================
// Sections
// =============================================================================

/// `[api]`
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `[openweathermap]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpenWeatherMapSettings {
    pub api_key: Option<String>,
}

/// `[geocoding]`
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodingSettings {
    pub reverse_url: String,
    pub user_agent: String,
}

impl Default for GeocodingSettings {
    fn default() -> Self {
        Self {
            reverse_url: NOMINATIM_REVERSE_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// `[external]`
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalSettings {
    pub url: String,
    pub interval_secs: u64,
    pub latitude: f64,
    pub longitude: f64,
}

impl ExternalSettings {
    pub fn position(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

impl Default for ExternalSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_EXTERNAL_URL.to_string(),
            interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            latitude: DEFAULT_EXTERNAL_POSITION.lat,
            longitude: DEFAULT_EXTERNAL_POSITION.lon,
        }
    }
}

/// `[device]`: the position source used in place of a device location API.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceSettings {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub permission: Option<PermissionState>,
}

impl DeviceSettings {
    /// Configured fix, when both components are set.
    pub fn position(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.latitude?, self.longitude?))
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
        }
    }
}

// =============================================================================
// File
// =============================================================================

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub api: ApiSettings,
    pub openweathermap: OpenWeatherMapSettings,
    pub geocoding: GeocodingSettings,
    pub external: ExternalSettings,
    pub device: DeviceSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<string>"),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|props| props.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Write every set key to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }

        ini.write_to_file(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Air-pollution key, with the environment taking precedence.
    pub fn openweathermap_key(&self) -> Option<String> {
        resolve_key(
            std::env::var(OPENWEATHERMAP_KEY_ENV).ok(),
            self.openweathermap.api_key.clone(),
        )
    }
}

/// Pick the first non-blank key.
fn resolve_key(env: Option<String>, file: Option<String>) -> Option<String> {
    env.filter(|k| !k.trim().is_empty())
        .or(file)
        .filter(|k| !k.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.api.base_url, "http://localhost:5000/api");
        assert_eq!(config.external.interval_secs, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_overrides_only_named_keys() {
        let config = ConfigFile::parse(
            "[api]\nbase_url = http://backend:8080/api\n\n[device]\nlatitude = -12.07\nlongitude = -75.21\npermission = granted\n",
        )
        .unwrap();

        assert_eq!(config.api.base_url, "http://backend:8080/api");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.device.position(), Some(Coordinates::new(-12.07, -75.21)));
        assert_eq!(config.device.permission, Some(PermissionState::Granted));
    }

    #[test]
    fn test_parse_rejects_bad_value() {
        let err = ConfigFile::parse("[external]\ninterval = soon\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.openweathermap.api_key = Some("abc123".into());
        config.logging.directory = Some(dir.path().join("logs"));
        config.save_to(&path).unwrap();

        let reloaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_env_key_wins_over_file() {
        assert_eq!(
            resolve_key(Some("env".into()), Some("file".into())),
            Some("env".into())
        );
        assert_eq!(resolve_key(Some("  ".into()), Some("file".into())), Some("file".into()));
        assert_eq!(resolve_key(None, Some(" ".into())), None);
    }
}
