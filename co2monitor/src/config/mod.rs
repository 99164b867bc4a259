//! Configuration file support.
//!
//! ```ini
//! [api]
//! base_url = http://localhost:5000/api
//! timeout = 10
//!
//! [openweathermap]
//! api_key =
//!
//! [device]
//! latitude = -12.0667
//! longitude = -75.2
//! permission = granted
//!
//! [logging]
//! level = info
//! directory = /var/log/co2monitor
//! ```

mod file;
mod keys;

use std::path::PathBuf;

use thiserror::Error;

pub use file::{
    config_dir, config_file_path, ApiSettings, ConfigFile, DeviceSettings, ExternalSettings,
    GeocodingSettings, LoggingSettings, OpenWeatherMapSettings, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
    DEFAULT_LOG_LEVEL, OPENWEATHERMAP_KEY_ENV,
};
pub use keys::ConfigKey;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}
