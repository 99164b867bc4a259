//! Device location acquisition.
//!
//! [`LocationMachine`] is the pure bounded-retry state machine;
//! [`LocationDetector`] drives it against the platform seams in
//! [`platform`].

mod detector;
mod machine;
pub mod platform;
mod types;

pub use detector::{LocationDetector, LocationHandle, DEFAULT_COMMAND_CAPACITY};
pub use machine::{LocationEffect, LocationEvent, LocationMachine, LocationState};
pub use platform::{
    PermissionProbe, Platform, PositionProvider, Scheduler, StaticPosition, TokioScheduler,
};
pub use types::{
    AccuracyMode, GeoAttempt, GeoOutcome, LocationNotice, PermissionState, PositionError,
    PositionResult, CACHED_FIX_MAX_AGE_MS, FIRST_ATTEMPT_TIMEOUT_MS, MAX_ATTEMPTS, RETRY_DELAY,
    RETRY_ATTEMPT_TIMEOUT_MS,
};
