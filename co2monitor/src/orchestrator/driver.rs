//! Dashboard actor.
//!
//! [`DashboardService`] owns a [`Dashboard`] inside one task and performs
//! the I/O its selection plans ask for. Each fetch runs in a spawned task
//! and reports back as an [`Update`] tagged with its launch epoch; the
//! dashboard drops whatever is stale. In-flight fetches are never aborted.
//!
//! ```text
//!  DashboardHandle ──► Command ──► ┌──────────────────┐
//!                                  │ DashboardService │──► SceneSink
//!  spawned fetches ──► Update ───► │    Dashboard     │
//!                                  └──────────────────┘
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::{AirPollutionClient, HttpClient, MonitorApi};
use crate::catalog::CityCatalog;
use crate::location::LocationNotice;
use crate::model::{Coordinates, LocationQuery};

use super::dashboard::{Applied, Co2Request, Dashboard, Followup, SelectionPlan, Update, UpdateKind};
use super::epoch::Epoch;
use super::scene::{Alert, ExternalMarker, MapScene, SceneSink};

/// Default command channel capacity.
pub const DEFAULT_COMMAND_CAPACITY: usize = 64;

enum Command {
    Select {
        query: LocationQuery,
        reply: oneshot::Sender<Epoch>,
    },
    WaitSettled {
        reply: oneshot::Sender<MapScene>,
    },
    Snapshot {
        reply: oneshot::Sender<MapScene>,
    },
    External(ExternalMarker),
    UserLocation(Coordinates),
    Notice(LocationNotice),
    Alert(Alert),
}

/// Error returned when the dashboard task is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("dashboard service stopped")]
pub struct ServiceStopped;

/// Caller-side handle to a running dashboard.
#[derive(Clone)]
pub struct DashboardHandle {
    tx: mpsc::Sender<Command>,
}

impl DashboardHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ServiceStopped> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).await.map_err(|_| ServiceStopped)?;
        rx.await.map_err(|_| ServiceStopped)
    }

    async fn post(&self, command: Command) -> Result<(), ServiceStopped> {
        self.tx.send(command).await.map_err(|_| ServiceStopped)
    }

    /// Start a selection. Returns once the synchronous part is done.
    pub async fn select(&self, query: LocationQuery) -> Result<Epoch, ServiceStopped> {
        self.request(|reply| Command::Select { query, reply }).await
    }

    /// Wait until the current selection has settled.
    ///
    /// If a newer selection starts meanwhile, this waits for that one.
    pub async fn settled(&self) -> Result<MapScene, ServiceStopped> {
        self.request(|reply| Command::WaitSettled { reply }).await
    }

    /// Select and wait for the settled scene.
    pub async fn show(&self, query: LocationQuery) -> Result<MapScene, ServiceStopped> {
        self.select(query).await?;
        self.settled().await
    }

    /// Current scene, settled or not.
    pub async fn snapshot(&self) -> Result<MapScene, ServiceStopped> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn update_external(&self, marker: ExternalMarker) -> Result<(), ServiceStopped> {
        self.post(Command::External(marker)).await
    }

    pub async fn set_user_location(&self, at: Coordinates) -> Result<(), ServiceStopped> {
        self.post(Command::UserLocation(at)).await
    }

    pub async fn show_notice(&self, notice: LocationNotice) -> Result<(), ServiceStopped> {
        self.post(Command::Notice(notice)).await
    }

    pub async fn alert(&self, alert: Alert) -> Result<(), ServiceStopped> {
        self.post(Command::Alert(alert)).await
    }
}

/// The dashboard actor.
pub struct DashboardService<C> {
    dashboard: Dashboard,
    api: Arc<MonitorApi<C>>,
    air: Arc<AirPollutionClient<C>>,
    sink: Box<dyn SceneSink>,
    command_rx: mpsc::Receiver<Command>,
    update_tx: mpsc::UnboundedSender<Update>,
    update_rx: mpsc::UnboundedReceiver<Update>,
    waiters: Vec<oneshot::Sender<MapScene>>,
}

impl<C: HttpClient + 'static> DashboardService<C> {
    /// Create a service and its handle.
    pub fn new(
        catalog: CityCatalog,
        api: Arc<MonitorApi<C>>,
        air: Arc<AirPollutionClient<C>>,
        sink: Box<dyn SceneSink>,
    ) -> (Self, DashboardHandle) {
        let (tx, command_rx) = mpsc::channel(DEFAULT_COMMAND_CAPACITY);
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        let service = Self {
            dashboard: Dashboard::new(catalog),
            api,
            air,
            sink,
            command_rx,
            update_tx,
            update_rx,
            waiters: Vec::new(),
        };

        (service, DashboardHandle { tx })
    }

    /// Run until shutdown is signalled or every handle is dropped.
    pub async fn run(mut self, shutdown: CancellationToken) {
        debug!("Dashboard service starting");
        self.sink.render(self.dashboard.scene());

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("Dashboard service shutting down");
                    break;
                }

                Some(update) = self.update_rx.recv() => {
                    self.apply(update);
                }

                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => self.handle(command),
                        None => break,
                    }
                }
            }
        }

        debug!("Dashboard service stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Select { query, reply } => {
                let plan = self.dashboard.select(query);
                let epoch = plan.epoch;
                self.launch(plan);
                self.render();
                let _ = reply.send(epoch);
            }
            Command::WaitSettled { reply } => {
                if self.dashboard.is_settled() {
                    let _ = reply.send(self.dashboard.scene().clone());
                } else {
                    self.waiters.push(reply);
                }
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.dashboard.scene().clone());
            }
            Command::External(marker) => {
                self.dashboard.set_external(marker);
                self.render();
            }
            Command::UserLocation(at) => {
                self.dashboard.set_user_location(at);
                self.render();
            }
            Command::Notice(notice) => {
                self.dashboard.show_notice(notice);
                self.render();
            }
            Command::Alert(alert) => {
                self.dashboard.set_alert(alert);
                self.render();
            }
        }
    }

    fn apply(&mut self, update: Update) {
        let epoch = update.epoch;
        match self.dashboard.apply(update) {
            Applied::Stale => {}
            Applied::Applied(followup) => {
                if let Some(followup) = followup {
                    self.follow(epoch, followup);
                }
                self.render();
                if self.dashboard.is_settled() {
                    info!(epoch = %epoch, status = ?self.dashboard.status(), "Selection settled");
                    self.release_waiters();
                }
            }
        }
    }

    fn render(&mut self) {
        self.sink.render(self.dashboard.scene());
    }

    fn release_waiters(&mut self) {
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(self.dashboard.scene().clone());
        }
    }

    fn launch(&self, plan: SelectionPlan) {
        let SelectionPlan {
            epoch,
            co2,
            weather_at,
            lookup_city,
        } = plan;

        let api = Arc::clone(&self.api);
        let tx = self.update_tx.clone();
        tokio::spawn(async move {
            let result = match co2 {
                Co2Request::City(name) => api.co2_for_city(&name).await,
                Co2Request::Custom(at) => api.co2_custom(at).await,
            };
            let _ = tx.send(Update::new(epoch, UpdateKind::Co2(result)));
        });

        if let Some(at) = weather_at {
            self.follow(epoch, Followup::Weather(at));
        }

        if let Some(name) = lookup_city {
            let api = Arc::clone(&self.api);
            let tx = self.update_tx.clone();
            tokio::spawn(async move {
                let result = api.city_coordinates(&name).await;
                let _ = tx.send(Update::new(epoch, UpdateKind::CityResolved(result)));
            });
        }
    }

    fn follow(&self, epoch: Epoch, followup: Followup) {
        let tx = self.update_tx.clone();
        match followup {
            Followup::Weather(at) => {
                let api = Arc::clone(&self.api);
                tokio::spawn(async move {
                    let result = api.weather(at).await;
                    let _ = tx.send(Update::new(epoch, UpdateKind::Weather(result)));
                });
            }
            Followup::FallbackAirQuality(at) => {
                let air = Arc::clone(&self.air);
                tokio::spawn(async move {
                    let result = air.current(at).await;
                    let _ = tx.send(Update::new(epoch, UpdateKind::FallbackAirQuality(result)));
                });
            }
        }
    }
}
