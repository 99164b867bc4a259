//! Async driver for the location state machine.
//!
//! [`LocationDetector`] owns a [`LocationMachine`] inside one task. Callers
//! talk to it through a cloneable [`LocationHandle`]. Platform calls and the
//! retry timer run in spawned tasks that report back over a channel, tagged
//! with the sequence they were launched for.
//!
//! ```text
//!  LocationHandle::detect ──► Command ──► ┌──────────────────┐
//!                                         │ LocationDetector │──► notices
//!  spawned probe / position / timer ────► │  LocationMachine │
//!               (LocationEvent)           └──────────────────┘
//!                                                  │
//!                                      oneshot ◄───┘ GeoOutcome
//! ```
//!
//! Starting a new detection while one is pending answers the older caller
//! with [`GeoOutcome::Superseded`].

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::machine::{LocationEffect, LocationEvent, LocationMachine};
use super::platform::{PermissionProbe, Platform, PositionProvider, Scheduler};
use super::types::{GeoOutcome, LocationNotice};

/// Default command channel capacity.
pub const DEFAULT_COMMAND_CAPACITY: usize = 16;

/// A detection request.
struct DetectCommand {
    manual: bool,
    reply: oneshot::Sender<GeoOutcome>,
}

/// Caller-side handle to a running detector.
#[derive(Clone)]
pub struct LocationHandle {
    tx: mpsc::Sender<DetectCommand>,
}

impl LocationHandle {
    /// Run a detection and wait for its outcome.
    ///
    /// `manual` resets the attempt counter first. Returns
    /// [`GeoOutcome::Unavailable`] if the detector has stopped.
    pub async fn detect(&self, manual: bool) -> GeoOutcome {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(DetectCommand { manual, reply }).await.is_err() {
            return GeoOutcome::Unavailable;
        }
        rx.await.unwrap_or(GeoOutcome::Unavailable)
    }

    /// Reset counters and detect again, regardless of the current state.
    pub async fn reset_and_retry(&self) -> GeoOutcome {
        self.detect(true).await
    }
}

/// The location detector actor.
pub struct LocationDetector {
    machine: LocationMachine,
    provider: Arc<dyn PositionProvider>,
    probe: Option<Arc<dyn PermissionProbe>>,
    scheduler: Arc<dyn Scheduler>,
    notices: Option<mpsc::UnboundedSender<LocationNotice>>,
    command_rx: mpsc::Receiver<DetectCommand>,
    event_tx: mpsc::UnboundedSender<LocationEvent>,
    event_rx: mpsc::UnboundedReceiver<LocationEvent>,
    /// Caller waiting on the current sequence.
    waiter: Option<(u64, oneshot::Sender<GeoOutcome>)>,
}

impl LocationDetector {
    /// Create a detector and its handle.
    pub fn new(
        provider: Arc<dyn PositionProvider>,
        scheduler: Arc<dyn Scheduler>,
        platform: Platform,
    ) -> (Self, LocationHandle) {
        let (tx, command_rx) = mpsc::channel(DEFAULT_COMMAND_CAPACITY);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let detector = Self {
            machine: LocationMachine::new(platform.constrained),
            provider,
            probe: None,
            scheduler,
            notices: None,
            command_rx,
            event_tx,
            event_rx,
            waiter: None,
        };

        (detector, LocationHandle { tx })
    }

    /// Use a permission probe before the first attempt of each sequence.
    pub fn with_probe(mut self, probe: Arc<dyn PermissionProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Forward panel notices to a channel.
    pub fn with_notices(mut self, notices: mpsc::UnboundedSender<LocationNotice>) -> Self {
        self.notices = Some(notices);
        self
    }

    /// Run until shutdown is signalled or every handle is dropped.
    pub async fn run(mut self, shutdown: CancellationToken) {
        debug!("Location detector starting");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("Location detector shutting down");
                    break;
                }

                Some(event) = self.event_rx.recv() => {
                    self.apply(event);
                }

                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => self.start(command),
                        None => break,
                    }
                }
            }
        }

        if let Some((_, reply)) = self.waiter.take() {
            let _ = reply.send(GeoOutcome::Superseded);
        }
        debug!("Location detector stopped");
    }

    fn start(&mut self, command: DetectCommand) {
        if let Some((sequence, reply)) = self.waiter.take() {
            info!(sequence, "Pending detection superseded");
            let _ = reply.send(GeoOutcome::Superseded);
        }

        // Start opens the next sequence; register first so a synchronous
        // finish reaches this caller.
        self.waiter = Some((self.machine.sequence() + 1, command.reply));
        self.apply(LocationEvent::Start {
            manual: command.manual,
        });
    }

    fn apply(&mut self, event: LocationEvent) {
        let mut pending = vec![event];
        while let Some(event) = pending.pop() {
            for effect in self.machine.handle(event) {
                if let Some(next) = self.perform(effect) {
                    pending.push(next);
                }
            }
        }
    }

    /// Perform one effect. Synchronous effects return their follow-up event.
    fn perform(&mut self, effect: LocationEffect) -> Option<LocationEvent> {
        match effect {
            LocationEffect::CheckSupport => Some(LocationEvent::SupportChecked {
                supported: self.provider.is_supported(),
            }),
            LocationEffect::CheckPermission { sequence } => {
                let Some(probe) = self.probe.clone() else {
                    return Some(LocationEvent::PermissionChecked {
                        sequence,
                        permission: None,
                    });
                };
                let events = self.event_tx.clone();
                tokio::spawn(async move {
                    let permission = probe.query().await;
                    let _ = events.send(LocationEvent::PermissionChecked {
                        sequence,
                        permission,
                    });
                });
                None
            }
            LocationEffect::RequestPosition { sequence, attempt } => {
                let provider = Arc::clone(&self.provider);
                let events = self.event_tx.clone();
                tokio::spawn(async move {
                    let result = provider.current_position(attempt).await;
                    let _ = events.send(LocationEvent::PositionResolved {
                        sequence,
                        attempt: attempt.number,
                        result,
                    });
                });
                None
            }
            LocationEffect::ScheduleRetry { sequence, delay } => {
                let scheduler = Arc::clone(&self.scheduler);
                let events = self.event_tx.clone();
                tokio::spawn(async move {
                    scheduler.sleep(delay).await;
                    let _ = events.send(LocationEvent::RetryDue { sequence });
                });
                None
            }
            LocationEffect::Notify(notice) => {
                debug!(notice = %notice, "Location notice");
                if let Some(notices) = &self.notices {
                    let _ = notices.send(notice);
                }
                None
            }
            LocationEffect::Finish(outcome) => {
                self.finish(outcome);
                None
            }
        }
    }

    fn finish(&mut self, outcome: GeoOutcome) {
        let sequence = self.machine.sequence();
        info!(sequence, outcome = ?outcome, "Location detection finished");
        match self.waiter.take() {
            Some((waiting, reply)) if waiting == sequence => {
                let _ = reply.send(outcome);
            }
            other => self.waiter = other,
        }
    }
}
