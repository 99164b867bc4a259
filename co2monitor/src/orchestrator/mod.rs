//! Selection orchestration.
//!
//! A selection fans out into a CO2 fetch, a weather fetch and, when the
//! weather carries no AQI, an air-pollution fallback. Results land in any
//! order and the map is re-derived after each one. Only the latest
//! selection may change what is shown.
//!
//! - [`Dashboard`]: the synchronous selection state owner
//! - [`DashboardService`]: the actor that runs its fetches
//! - [`search`]: suggestion and "perform search" resolution

mod dashboard;
mod driver;
mod epoch;
mod sample;
mod scene;
pub mod search;

pub use dashboard::{
    Applied, Co2Request, Dashboard, Followup, SelectionPlan, Update, UpdateKind,
};
pub use driver::{DashboardHandle, DashboardService, ServiceStopped, DEFAULT_COMMAND_CAPACITY};
pub use epoch::Epoch;
pub use sample::{AirQualityState, Co2State, EnvironmentSample, SelectionStatus};
pub use scene::{
    Alert, AlertLevel, AqiMarker, AqiSummary, ExternalMarker, MapScene, MapView, MarkerState,
    NullSink, Panel, SceneSink, EXTERNAL_MARKER_COLOR, INITIAL_VIEW, SELECTION_ZOOM,
};
pub use search::{Suggestion, SuggestionKind, SearchError};
