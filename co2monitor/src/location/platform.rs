//! Platform seams for location acquisition.
//!
//! The detector never talks to a device API directly. It goes through:
//!
//! - [`PositionProvider`] for capability support and position requests
//! - [`PermissionProbe`] for the optional permission pre-check
//! - [`Scheduler`] for the retry delay

use std::time::Duration;

use tracing::debug;

use super::types::{GeoAttempt, PermissionState, PositionError, PositionResult};
use crate::api::BoxFuture;
use crate::model::Coordinates;

/// Source of device positions.
pub trait PositionProvider: Send + Sync {
    /// Whether the platform has a location capability at all.
    fn is_supported(&self) -> bool;

    /// Request one position fix with the given parameters.
    fn current_position(&self, attempt: GeoAttempt) -> BoxFuture<'_, PositionResult>;
}

/// Best-effort permission query.
pub trait PermissionProbe: Send + Sync {
    /// `None` when the query is unavailable or failed.
    fn query(&self) -> BoxFuture<'_, Option<PermissionState>>;
}

/// Timer used for scheduled continuations.
pub trait Scheduler: Send + Sync {
    fn sleep(&self, delay: Duration) -> BoxFuture<'_, ()>;
}

/// Scheduler backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn sleep(&self, delay: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(delay))
    }
}

/// Platform traits that affect detection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Automatic detection is unreliable here and must be user-initiated.
    pub constrained: bool,
}

impl Platform {
    /// Policy for the platform this binary was built for. macOS is
    /// constrained.
    pub fn current() -> Self {
        Self {
            constrained: cfg!(target_os = "macos"),
        }
    }

    pub fn unconstrained() -> Self {
        Self { constrained: false }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

/// Position provider with a fixed, configured answer.
///
/// Stands in for a device API on hosts that have none: a configured
/// position is always returned; without one every request reports
/// `PositionUnavailable`.
#[derive(Debug, Clone, Default)]
pub struct StaticPosition {
    position: Option<Coordinates>,
    permission: Option<PermissionState>,
}

impl StaticPosition {
    pub fn new(position: Option<Coordinates>) -> Self {
        Self {
            position,
            permission: None,
        }
    }

    pub fn with_permission(mut self, permission: Option<PermissionState>) -> Self {
        self.permission = permission;
        self
    }
}

impl PositionProvider for StaticPosition {
    fn is_supported(&self) -> bool {
        true
    }

    fn current_position(&self, attempt: GeoAttempt) -> BoxFuture<'_, PositionResult> {
        let result = match (self.permission, self.position) {
            (Some(PermissionState::Denied), _) => Err(PositionError::PermissionDenied),
            (_, Some(at)) => Ok(at),
            (_, None) => Err(PositionError::PositionUnavailable),
        };
        debug!(attempt = attempt.number, result = ?result, "Static position request");
        Box::pin(async move { result })
    }
}

impl PermissionProbe for StaticPosition {
    fn query(&self) -> BoxFuture<'_, Option<PermissionState>> {
        let permission = self.permission;
        Box::pin(async move { permission })
    }
}
