//! CO2 Monitor - ambient CO2, weather and air quality on a map
//!
//! This library is the client core of the CO2 monitor dashboard. It picks a
//! location (a catalog city, a global search hit or the device position),
//! fetches its CO2 sample, weather and air quality from the backend, and
//! derives the map scene a renderer draws.
//!
//! # Example
//!
//! ```no_run
//! use co2monitor::app::AppBuilder;
//! use co2monitor::config::ConfigFile;
//! use co2monitor::model::LocationQuery;
//!
//! # async fn demo() -> Result<(), co2monitor::app::AppError> {
//! let app = AppBuilder::new(ConfigFile::load().unwrap_or_default()).start()?;
//! let scene = app.show(LocationQuery::city("huancayo")).await?;
//! if let Some(marker) = scene.primary {
//!     println!("{} ppm, {}", marker.ppm_text, marker.hazard_label);
//! }
//! app.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod app;
pub mod catalog;
pub mod config;
pub mod external;
pub mod geocode;
pub mod hazard;
pub mod location;
pub mod logging;
pub mod model;
pub mod orchestrator;
