//! Location acquisition state machine.
//!
//! A pure transition table: [`LocationMachine::handle`] takes an event and
//! returns the effects the driver must perform. No timers, no I/O, so retry
//! arithmetic and stale-result suppression are testable synchronously.
//!
//! ```text
//!            Start
//!   Idle ──────────► CheckingSupport ──unsupported──► Unsupported
//!                          │
//!                          ▼
//!                 CheckingPermission ──denied──► Denied
//!                          │
//!                          ▼
//!            ┌──────► Requesting ──ok──► Success
//!            │             │
//!        RetryDue     unavailable/timeout ──3rd──► Exhausted
//!            │             │
//!            └──────── Retrying
//! ```
//!
//! Every `Start` opens a new sequence. Completions and timer events carry
//! the sequence they were launched for and are dropped if it is no longer
//! current.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::types::{
    GeoAttempt, GeoOutcome, LocationNotice, PermissionState, PositionError, PositionResult,
    MAX_ATTEMPTS, RETRY_DELAY,
};
use crate::model::Coordinates;

/// State of the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationState {
    Idle,
    CheckingSupport,
    CheckingPermission,
    Requesting { attempt: u32 },
    Retrying { failed_attempt: u32 },
    Success(Coordinates),
    Denied,
    Unsupported,
    Exhausted,
}

impl LocationState {
    /// Whether a sequence is in progress.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            LocationState::CheckingSupport
                | LocationState::CheckingPermission
                | LocationState::Requesting { .. }
                | LocationState::Retrying { .. }
        )
    }
}

/// Input to the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationEvent {
    /// Begin a new sequence. `manual` resets the attempt counter.
    Start { manual: bool },
    SupportChecked { supported: bool },
    /// `None` when the probe is absent or failed.
    PermissionChecked {
        sequence: u64,
        permission: Option<PermissionState>,
    },
    PositionResolved {
        sequence: u64,
        attempt: u32,
        result: PositionResult,
    },
    RetryDue { sequence: u64 },
}

/// Work requested by the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEffect {
    CheckSupport,
    CheckPermission { sequence: u64 },
    RequestPosition { sequence: u64, attempt: GeoAttempt },
    ScheduleRetry { sequence: u64, delay: Duration },
    Notify(LocationNotice),
    /// The current sequence has finished with this outcome.
    Finish(GeoOutcome),
}

/// Bounded-retry location acquisition.
#[derive(Debug)]
pub struct LocationMachine {
    state: LocationState,
    sequence: u64,
    attempts: u32,
    last_error: Option<PositionError>,
    constrained: bool,
}

impl LocationMachine {
    /// `constrained` selects platform-specific exhaustion advice.
    pub fn new(constrained: bool) -> Self {
        Self {
            state: LocationState::Idle,
            sequence: 0,
            attempts: 0,
            last_error: None,
            constrained,
        }
    }

    pub fn state(&self) -> LocationState {
        self.state
    }

    /// Identity of the current sequence.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Attempts consumed in the current sequence.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<PositionError> {
        self.last_error
    }

    /// Apply an event and return the effects to perform, in order.
    pub fn handle(&mut self, event: LocationEvent) -> Vec<LocationEffect> {
        match event {
            LocationEvent::Start { manual } => self.start(manual),
            LocationEvent::SupportChecked { supported } => self.support_checked(supported),
            LocationEvent::PermissionChecked {
                sequence,
                permission,
            } => self.permission_checked(sequence, permission),
            LocationEvent::PositionResolved {
                sequence,
                attempt,
                result,
            } => self.position_resolved(sequence, attempt, result),
            LocationEvent::RetryDue { sequence } => self.retry_due(sequence),
        }
    }

    fn start(&mut self, manual: bool) -> Vec<LocationEffect> {
        if manual {
            self.attempts = 0;
            self.last_error = None;
        }
        self.sequence += 1;
        self.state = LocationState::CheckingSupport;
        debug!(sequence = self.sequence, manual, "Location sequence started");
        vec![LocationEffect::CheckSupport]
    }

    fn support_checked(&mut self, supported: bool) -> Vec<LocationEffect> {
        if self.state != LocationState::CheckingSupport {
            return Vec::new();
        }
        if !supported {
            info!(sequence = self.sequence, "Location capability not supported");
            self.state = LocationState::Unsupported;
            return vec![
                LocationEffect::Notify(LocationNotice::Unsupported),
                LocationEffect::Finish(GeoOutcome::Unavailable),
            ];
        }
        self.state = LocationState::CheckingPermission;
        vec![LocationEffect::CheckPermission {
            sequence: self.sequence,
        }]
    }

    fn permission_checked(
        &mut self,
        sequence: u64,
        permission: Option<PermissionState>,
    ) -> Vec<LocationEffect> {
        if sequence != self.sequence || self.state != LocationState::CheckingPermission {
            debug!(sequence, current = self.sequence, "Stale permission result dropped");
            return Vec::new();
        }
        if permission == Some(PermissionState::Denied) {
            info!(sequence, "Location permission previously denied");
            self.state = LocationState::Denied;
            return vec![
                LocationEffect::Notify(LocationNotice::Denied),
                LocationEffect::Finish(GeoOutcome::Denied),
            ];
        }
        self.begin_attempt()
    }

    fn begin_attempt(&mut self) -> Vec<LocationEffect> {
        if self.attempts >= MAX_ATTEMPTS {
            warn!(sequence = self.sequence, "Location attempts already exhausted");
            return self.exhaust();
        }
        self.attempts += 1;
        let attempt = GeoAttempt::nth(self.attempts);
        self.state = LocationState::Requesting {
            attempt: self.attempts,
        };
        info!(
            sequence = self.sequence,
            attempt = attempt.number,
            max = MAX_ATTEMPTS,
            high_accuracy = attempt.high_accuracy(),
            timeout_ms = attempt.timeout_ms,
            "Requesting position"
        );
        vec![
            LocationEffect::Notify(LocationNotice::Detecting {
                attempt: attempt.number,
                max: MAX_ATTEMPTS,
            }),
            LocationEffect::RequestPosition {
                sequence: self.sequence,
                attempt,
            },
        ]
    }

    fn position_resolved(
        &mut self,
        sequence: u64,
        attempt: u32,
        result: PositionResult,
    ) -> Vec<LocationEffect> {
        if sequence != self.sequence || self.state != (LocationState::Requesting { attempt }) {
            debug!(
                sequence,
                attempt,
                current = self.sequence,
                "Stale position result dropped"
            );
            return Vec::new();
        }

        match result {
            Ok(at) => {
                info!(sequence, attempt, lat = at.lat, lon = at.lon, "Position acquired");
                self.attempts = 0;
                self.last_error = None;
                self.state = LocationState::Success(at);
                vec![
                    LocationEffect::Notify(LocationNotice::Located(at)),
                    LocationEffect::Finish(GeoOutcome::Success(at)),
                ]
            }
            Err(PositionError::PermissionDenied) => {
                info!(sequence, attempt, "Position request denied");
                self.last_error = Some(PositionError::PermissionDenied);
                self.state = LocationState::Denied;
                vec![
                    LocationEffect::Notify(LocationNotice::Denied),
                    LocationEffect::Finish(GeoOutcome::Denied),
                ]
            }
            Err(error) => {
                self.last_error = Some(error);
                if self.attempts >= MAX_ATTEMPTS {
                    warn!(sequence, attempt, error = %error, "Final position attempt failed");
                    return self.exhaust();
                }

                let remaining = MAX_ATTEMPTS - self.attempts;
                warn!(sequence, attempt, remaining, error = %error, "Position attempt failed, retrying");
                self.state = LocationState::Retrying {
                    failed_attempt: attempt,
                };

                let mut effects = Vec::with_capacity(2);
                if self.attempts == 1 {
                    effects.push(LocationEffect::Notify(LocationNotice::Retrying {
                        failure: error,
                        remaining,
                    }));
                }
                effects.push(LocationEffect::ScheduleRetry {
                    sequence,
                    delay: RETRY_DELAY,
                });
                effects
            }
        }
    }

    fn retry_due(&mut self, sequence: u64) -> Vec<LocationEffect> {
        if sequence != self.sequence || !matches!(self.state, LocationState::Retrying { .. }) {
            debug!(sequence, current = self.sequence, "Stale retry suppressed");
            return Vec::new();
        }
        self.begin_attempt()
    }

    fn exhaust(&mut self) -> Vec<LocationEffect> {
        self.state = LocationState::Exhausted;
        vec![
            LocationEffect::Notify(LocationNotice::Exhausted {
                constrained: self.constrained,
            }),
            LocationEffect::Finish(GeoOutcome::Exhausted),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::types::AccuracyMode;

    fn requested(effects: &[LocationEffect]) -> Option<GeoAttempt> {
        effects.iter().find_map(|e| match e {
            LocationEffect::RequestPosition { attempt, .. } => Some(*attempt),
            _ => None,
        })
    }

    fn finished(effects: &[LocationEffect]) -> Option<GeoOutcome> {
        effects.iter().find_map(|e| match e {
            LocationEffect::Finish(outcome) => Some(*outcome),
            _ => None,
        })
    }

    /// Drive a machine from `Start` to its first position request.
    fn start(machine: &mut LocationMachine, manual: bool) -> GeoAttempt {
        machine.handle(LocationEvent::Start { manual });
        machine.handle(LocationEvent::SupportChecked { supported: true });
        let effects = machine.handle(LocationEvent::PermissionChecked {
            sequence: machine.sequence(),
            permission: Some(PermissionState::Granted),
        });
        requested(&effects).unwrap()
    }

    fn fail(machine: &mut LocationMachine, attempt: u32, error: PositionError) -> Vec<LocationEffect> {
        machine.handle(LocationEvent::PositionResolved {
            sequence: machine.sequence(),
            attempt,
            result: Err(error),
        })
    }

    #[test]
    fn test_three_timeouts_exhaust_with_expected_parameters() {
        let mut machine = LocationMachine::new(false);
        let mut attempts = vec![start(&mut machine, true)];

        for _ in 0..2 {
            let number = attempts.last().unwrap().number;
            let effects = fail(&mut machine, number, PositionError::Timeout);
            assert!(effects.contains(&LocationEffect::ScheduleRetry {
                sequence: machine.sequence(),
                delay: Duration::from_secs(2),
            }));
            assert_eq!(finished(&effects), None);

            let effects = machine.handle(LocationEvent::RetryDue {
                sequence: machine.sequence(),
            });
            attempts.push(requested(&effects).unwrap());
        }

        let params: Vec<_> = attempts
            .iter()
            .map(|a| (a.accuracy, a.timeout_ms, a.allow_cache))
            .collect();
        assert_eq!(
            params,
            vec![
                (AccuracyMode::High, 20_000, true),
                (AccuracyMode::Standard, 30_000, false),
                (AccuracyMode::Standard, 30_000, false),
            ]
        );

        let effects = fail(&mut machine, 3, PositionError::Timeout);
        assert_eq!(finished(&effects), Some(GeoOutcome::Exhausted));
        assert!(!effects
            .iter()
            .any(|e| matches!(e, LocationEffect::ScheduleRetry { .. })));
        assert_eq!(machine.state(), LocationState::Exhausted);
        assert_eq!(machine.attempts(), 3);
    }

    #[test]
    fn test_denied_at_first_attempt_freezes_count() {
        let mut machine = LocationMachine::new(false);
        start(&mut machine, true);

        let effects = fail(&mut machine, 1, PositionError::PermissionDenied);
        assert_eq!(finished(&effects), Some(GeoOutcome::Denied));
        assert!(effects.contains(&LocationEffect::Notify(LocationNotice::Denied)));
        assert!(!effects
            .iter()
            .any(|e| matches!(e, LocationEffect::ScheduleRetry { .. })));
        assert_eq!(machine.attempts(), 1);
        assert_eq!(machine.state(), LocationState::Denied);
    }

    #[test]
    fn test_unsupported_counts_no_attempt() {
        let mut machine = LocationMachine::new(false);
        machine.handle(LocationEvent::Start { manual: true });
        let effects = machine.handle(LocationEvent::SupportChecked { supported: false });

        assert_eq!(finished(&effects), Some(GeoOutcome::Unavailable));
        assert_eq!(machine.attempts(), 0);
        assert_eq!(machine.state(), LocationState::Unsupported);
    }

    #[test]
    fn test_permission_denied_precheck_skips_platform() {
        let mut machine = LocationMachine::new(false);
        machine.handle(LocationEvent::Start { manual: true });
        machine.handle(LocationEvent::SupportChecked { supported: true });
        let effects = machine.handle(LocationEvent::PermissionChecked {
            sequence: 1,
            permission: Some(PermissionState::Denied),
        });

        assert_eq!(finished(&effects), Some(GeoOutcome::Denied));
        assert_eq!(requested(&effects), None);
        assert_eq!(machine.attempts(), 0);
    }

    #[test]
    fn test_failing_probe_is_ignored() {
        let mut machine = LocationMachine::new(false);
        machine.handle(LocationEvent::Start { manual: false });
        machine.handle(LocationEvent::SupportChecked { supported: true });
        let effects = machine.handle(LocationEvent::PermissionChecked {
            sequence: 1,
            permission: None,
        });
        assert_eq!(requested(&effects).map(|a| a.number), Some(1));
    }

    #[test]
    fn test_success_resets_counters() {
        let mut machine = LocationMachine::new(false);
        start(&mut machine, true);
        fail(&mut machine, 1, PositionError::PositionUnavailable);
        machine.handle(LocationEvent::RetryDue { sequence: 1 });

        let at = Coordinates::new(-12.07, -75.21);
        let effects = machine.handle(LocationEvent::PositionResolved {
            sequence: 1,
            attempt: 2,
            result: Ok(at),
        });

        assert_eq!(finished(&effects), Some(GeoOutcome::Success(at)));
        assert_eq!(machine.attempts(), 0);
        assert_eq!(machine.last_error(), None);
    }

    #[test]
    fn test_retry_notice_only_after_first_failure() {
        let mut machine = LocationMachine::new(false);
        start(&mut machine, true);

        let first = fail(&mut machine, 1, PositionError::Timeout);
        assert!(first.contains(&LocationEffect::Notify(LocationNotice::Retrying {
            failure: PositionError::Timeout,
            remaining: 2,
        })));

        machine.handle(LocationEvent::RetryDue { sequence: 1 });
        let second = fail(&mut machine, 2, PositionError::Timeout);
        assert!(!second
            .iter()
            .any(|e| matches!(e, LocationEffect::Notify(LocationNotice::Retrying { .. }))));
    }

    #[test]
    fn test_manual_reset_suppresses_pending_retry() {
        let mut machine = LocationMachine::new(false);
        start(&mut machine, true);
        fail(&mut machine, 1, PositionError::Timeout);
        let old_sequence = machine.sequence();

        let attempt = start(&mut machine, true);
        assert_eq!(attempt.number, 1);
        assert_eq!(machine.attempts(), 1);

        assert!(machine
            .handle(LocationEvent::RetryDue {
                sequence: old_sequence
            })
            .is_empty());
        assert!(machine
            .handle(LocationEvent::PositionResolved {
                sequence: old_sequence,
                attempt: 1,
                result: Ok(Coordinates::new(0.0, 0.0)),
            })
            .is_empty());
        assert_eq!(machine.state(), LocationState::Requesting { attempt: 1 });
    }

    #[test]
    fn test_automatic_start_keeps_counters() {
        let mut machine = LocationMachine::new(true);
        start(&mut machine, true);
        fail(&mut machine, 1, PositionError::Timeout);
        machine.handle(LocationEvent::RetryDue { sequence: 1 });
        fail(&mut machine, 2, PositionError::Timeout);
        machine.handle(LocationEvent::RetryDue { sequence: 1 });
        let effects = fail(&mut machine, 3, PositionError::Timeout);
        assert!(effects.contains(&LocationEffect::Notify(LocationNotice::Exhausted {
            constrained: true
        })));

        machine.handle(LocationEvent::Start { manual: false });
        machine.handle(LocationEvent::SupportChecked { supported: true });
        let effects = machine.handle(LocationEvent::PermissionChecked {
            sequence: machine.sequence(),
            permission: None,
        });
        assert_eq!(finished(&effects), Some(GeoOutcome::Exhausted));
        assert_eq!(requested(&effects), None);

        let attempt = start(&mut machine, true);
        assert_eq!(attempt.number, 1);
    }

    #[test]
    fn test_result_for_wrong_attempt_is_dropped() {
        let mut machine = LocationMachine::new(false);
        start(&mut machine, true);
        assert!(fail(&mut machine, 2, PositionError::Timeout).is_empty());
        assert_eq!(machine.state(), LocationState::Requesting { attempt: 1 });
    }
}
